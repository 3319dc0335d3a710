//! Set differences for many-to-many attachments
//!
//! Resources that manage attachments (floating IPs, networks and disks on
//! an instance, members of a load balancer) compare the configured set with
//! the observed one and issue one attach or detach call per difference.

/// Elements of `a` that are not in `b`, in the order they appear in `a`.
/// Duplicates in `a` are kept.
pub fn difference<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().filter(|x| !b.contains(x)).cloned().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDiff<T> {
    pub to_attach: Vec<T>,
    pub to_detach: Vec<T>,
}

impl<T: PartialEq + Clone> AttachmentDiff<T> {
    pub fn between(desired: &[T], current: &[T]) -> Self {
        Self {
            to_attach: difference(desired, current),
            to_detach: difference(current, desired),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_attach.is_empty() && self.to_detach.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difference_of_overlapping_sets() {
        let a = [1, 2, 3];
        let b = [2, 3, 4];
        assert_eq!(difference(&a, &b), vec![1]);
        assert_eq!(difference(&b, &a), vec![4]);
    }

    #[test]
    fn difference_with_empty_side() {
        let a: [u64; 0] = [];
        let b = [1, 2];
        assert!(difference(&a, &b).is_empty());
        assert_eq!(difference(&b, &a), vec![1, 2]);
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(difference(&[5, 5, 6], &[6]), vec![5, 5]);
    }

    #[test]
    fn works_for_strings() {
        let desired = vec!["a".to_string(), "b".to_string()];
        let current = vec!["b".to_string(), "c".to_string()];
        let diff = AttachmentDiff::between(&desired, &current);
        assert_eq!(diff.to_attach, vec!["a".to_string()]);
        assert_eq!(diff.to_detach, vec!["c".to_string()]);
    }

    #[test]
    fn identical_sets_need_no_calls() {
        let diff = AttachmentDiff::between(&[3, 1], &[1, 3]);
        assert!(diff.is_empty());
    }
}
