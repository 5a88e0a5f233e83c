/// Return early with an error unless the condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

/// Return early with an error unless both sides are equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr, $err:expr) => {
        $crate::ensure!($left == $right, $err)
    };
}

/// Return early with an error unless both sides differ.
#[macro_export]
macro_rules! ensure_ne {
    ($left:expr, $right:expr, $err:expr) => {
        $crate::ensure!($left != $right, $err)
    };
}

/// Return early with an error.
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}
