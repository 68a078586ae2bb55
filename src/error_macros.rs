//
// src/error_macros.rs
//
// Macros for declaring the error catalogue (see src/error.rs for usage examples).
// Every error is its own struct with a styled, multi-paragraph Display.
//
//
// (C) 2020 Taras Zakharko
//
// This code is licensed under GPL 3.0

macro_rules! fmt_err_msg {
    // error header
    ((@err $($msg:literal)+)) => {
        fmt_err_msg!(@header ::console::Style::new().red().bold(), "error:", [$($msg)+] [])
    };
    ((@err $($msg:literal)+ [ $($arg:tt)* ])) => {
        fmt_err_msg!(@header ::console::Style::new().red().bold(), "error:", [$($msg)+] [$($arg)*])
    };
    // warning header (recoverable conditions)
    ((@warn $($msg:literal)+)) => {
        fmt_err_msg!(@header ::console::Style::new().yellow().bold(), "warning:", [$($msg)+] [])
    };
    ((@warn $($msg:literal)+ [ $($arg:tt)* ])) => {
        fmt_err_msg!(@header ::console::Style::new().yellow().bold(), "warning:", [$($msg)+] [$($arg)*])
    };
    // message body
    ((@div $($msg:literal)+ )) => {
        format!(concat!($($msg, " "),+))
    };
    ((@div $($msg:literal)+ [ $($arg:tt)* ])) => {
        format!(concat!($($msg, " "),+), $($arg)*)
    };
    // a dimmed hint line
    ((@hint $($msg:literal)+ )) => {
        ::console::Style::new().dim().apply_to(format!(concat!($($msg, " "),+))).to_string()
    };
    ((@hint $($msg:literal)+ [ $($arg:tt)* ])) => {
        ::console::Style::new().dim().apply_to(format!(concat!($($msg, " "),+), $($arg)*)).to_string()
    };
    // shared header layout: styled marker followed by the text
    (@header $style:expr, $marker:literal, [$($msg:literal)+] []) => {
        format!("{} {}", $style.apply_to($marker), format!(concat!($($msg, " "),+)))
    };
    (@header $style:expr, $marker:literal, [$($msg:literal)+] [$($arg:tt)+]) => {
        format!("{} {}", $style.apply_to($marker), format!(concat!($($msg, " "),+), $($arg)+))
    };
}


macro_rules! define_error {
    ($name:ident  @display($sel:ident) { $($msg:tt)* }) => {
        #[derive(Debug, Clone)]
        pub struct $name;

        define_error!(@impl $name, $sel, { $($msg)* });
    };
    ($name:ident { $($elem:tt)* } @display($sel:ident) { $($msg:tt)* }) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            $($elem)*
        }

        define_error!(@impl $name, $sel, { $($msg)* });
    };
    (@impl $name:ident, $sel:ident, { $($msg:tt)* }) => {
        impl std::error::Error for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&$sel, __formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                let msg = [$((fmt_err_msg!($msg)),)+].join("\n\n");

                __formatter.write_str(&msg)
            }
        }
    };
}
