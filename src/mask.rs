//! Masking of low-confidence consensus bases.

use crate::pileup::Verdict;

/// The character written in place of a masked base.
pub const MASK: u8 = b'N';

/// Masks every position of `sequence` whose verdict is a failure.
///
/// Positions are 0-based. Positions without a verdict keep their base, and
/// verdicts for positions beyond the end of the sequence are ignored.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use consensus_qc::mask::mask_sequence;
/// use consensus_qc::pileup::Verdict;
/// use consensus_qc::pileup::policy::Reason;
/// use nonempty::NonEmpty;
///
/// let fail = Verdict::Fail(NonEmpty::new(Reason::LowDepth));
///
/// let verdicts = BTreeMap::from([(0, Verdict::Pass), (4, fail.clone())]);
/// assert_eq!(mask_sequence(b"ATCATC", &verdicts), "ATCANC");
///
/// let verdicts = BTreeMap::from([(0, fail.clone()), (4, fail)]);
/// assert_eq!(mask_sequence(b"ATCATC", &verdicts), "NTCANC");
/// ```
pub fn mask_sequence<'a, I>(sequence: &[u8], verdicts: I) -> String
where
    I: IntoIterator<Item = (&'a usize, &'a Verdict)>,
{
    let mut masked = sequence.to_vec();

    for (position, verdict) in verdicts {
        if let (Some(base), true) = (masked.get_mut(*position), verdict.is_fail()) {
            *base = MASK;
        }
    }

    masked.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nonempty::NonEmpty;

    use super::*;
    use crate::pileup::policy::Reason;

    #[test]
    fn test_leaves_unjudged_positions_alone() {
        let verdicts = HashMap::<usize, Verdict>::new();
        assert_eq!(mask_sequence(b"ACGT", &verdicts), "ACGT");
    }

    #[test]
    fn test_ignores_positions_past_the_end() {
        let verdicts = HashMap::from([(10, Verdict::Fail(NonEmpty::new(Reason::NoCoverage)))]);
        assert_eq!(mask_sequence(b"ACGT", &verdicts), "ACGT");
    }

    #[test]
    fn test_is_idempotent() {
        let verdicts = HashMap::from([(1, Verdict::Fail(NonEmpty::new(Reason::AlleleBias)))]);
        let once = mask_sequence(b"ACGT", &verdicts);
        let twice = mask_sequence(once.as_bytes(), &verdicts);
        assert_eq!(once, "ANGT");
        assert_eq!(once, twice);
    }
}
