//! ---
//! cm_section: "03-logging"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Structured logging adapters and sinks."
//! cm_version: "v0.4.0"
//! cm_owner: "tbd"
//! ---
//! Context-enriched logging macros.

#[doc(hidden)]
#[macro_export]
macro_rules! __cm_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = &$ctx;
        $crate::tracing::event!(
            $level,
            group = ctx.group.unwrap_or(""),
            strategy = ctx.strategy.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            endpoint = ctx.endpoint.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with campaign context.
#[macro_export]
macro_rules! cm_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with campaign context.
#[macro_export]
macro_rules! cm_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with campaign context.
#[macro_export]
macro_rules! cm_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__cm_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
