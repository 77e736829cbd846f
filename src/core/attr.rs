//! Mutex attribute model and the error-checking upgrade policy.
//!
//! Before a mutex is initialized, its declared type is inspected. Types
//! whose contract requires neither recursion nor any behavior beyond
//! plain locking are promoted to error-checking, which turns silent
//! self-deadlock into EDEADLK and unlock-of-unowned into EPERM. Recursive
//! mutexes are left alone (their contract requires re-entry), as are
//! mutexes already declared error-checking.

/// The mutex types a caller can declare, mirroring the host thread
/// library's set. `Timed`, `Adaptive` and `Fast` are aliases or platform
/// variants of plain locking and carry no extra contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexType {
    Normal,
    Default,
    Timed,
    Adaptive,
    Fast,
    ErrorCheck,
    Recursive,
}

impl MutexType {
    /// Whether the upgrade policy may promote this type.
    pub fn compatible_with_error_checking(self) -> bool {
        !matches!(self, MutexType::ErrorCheck | MutexType::Recursive)
    }

    /// Apply the upgrade policy.
    pub fn upgrade(self) -> MutexType {
        if self.compatible_with_error_checking() {
            MutexType::ErrorCheck
        } else {
            self
        }
    }
}

/// Caller-supplied mutex attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexAttr {
    pub mutex_type: MutexType,
}

impl MutexAttr {
    pub fn new(mutex_type: MutexType) -> Self {
        MutexAttr { mutex_type }
    }
}

impl Default for MutexAttr {
    fn default() -> Self {
        MutexAttr {
            mutex_type: MutexType::Default,
        }
    }
}

/// The type a wrapper actually initializes the mutex with. A missing
/// attribute set synthesizes an error-checking one.
pub fn effective_type(attr: Option<&MutexAttr>) -> MutexType {
    attr.copied().unwrap_or_default().mutex_type.upgrade()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatible_types_are_promoted() {
        for ty in [
            MutexType::Normal,
            MutexType::Default,
            MutexType::Timed,
            MutexType::Adaptive,
            MutexType::Fast,
        ] {
            assert_eq!(ty.upgrade(), MutexType::ErrorCheck);
        }
    }

    #[test]
    fn recursive_and_error_checking_pass_through() {
        assert_eq!(MutexType::Recursive.upgrade(), MutexType::Recursive);
        assert_eq!(MutexType::ErrorCheck.upgrade(), MutexType::ErrorCheck);
    }

    #[test]
    fn missing_attributes_synthesize_error_checking() {
        assert_eq!(effective_type(None), MutexType::ErrorCheck);
        assert_eq!(
            effective_type(Some(&MutexAttr::new(MutexType::Recursive))),
            MutexType::Recursive
        );
    }
}
