#[macro_export]
macro_rules! zip_iters {
    ($first:expr $(,)?) => {
        $first.iter()
    };

    // zip the head with the zip of the tail
    ($first:expr, $($rest:expr),+ $(,)?) => {
        $first.iter().zip($crate::zip_iters!($($rest),+))
    };
}

/// Unwraps a resolved column role or bails out of the enclosing function with
/// `MetricError::MissingColumn` carrying the given message.
#[macro_export]
macro_rules! require_column {
    ($role:expr, $msg:expr $(,)?) => {
        match $role {
            Some(name) => name,
            None => return Err($crate::errors::MetricError::MissingColumn($msg.into())),
        }
    };
}
