//! Run-level statistics over a [`Pileup`](crate::Pileup).

use std::collections::BTreeMap;

use crate::pileup::Verdict;
use crate::pileup::policy::Reason;

/// A summary of the verdicts across every consensus position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    /// The number of consensus positions.
    positions: usize,

    /// The number of masked positions.
    masked: usize,

    /// The number of positions failing for each reason.
    reasons: BTreeMap<Reason, usize>,

    /// The sum of usable depth across all positions.
    depth: usize,
}

impl Summary {
    /// Records one position.
    pub(crate) fn push(&mut self, verdict: &Verdict, depth: usize) {
        self.positions += 1;
        self.depth += depth;

        if verdict.is_fail() {
            self.masked += 1;
        }

        for reason in verdict.reasons() {
            *self.reasons.entry(*reason).or_default() += 1;
        }
    }

    /// The number of consensus positions.
    pub fn positions(&self) -> usize {
        self.positions
    }

    /// The number of masked positions.
    pub fn masked(&self) -> usize {
        self.masked
    }

    /// The number of positions failing for `reason`.
    ///
    /// A position failing for several reasons is counted once per reason.
    pub fn failures(&self, reason: Reason) -> usize {
        self.reasons.get(&reason).copied().unwrap_or_default()
    }

    /// The percentage of positions that were masked.
    pub fn masked_percent(&self) -> f64 {
        match self.positions {
            0 => 0.0,
            n => self.masked as f64 * 100.0 / n as f64,
        }
    }

    /// The mean usable depth per position.
    pub fn mean_depth(&self) -> f64 {
        match self.positions {
            0 => 0.0,
            n => self.depth as f64 / n as f64,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "positions\t{}", self.positions)?;
        writeln!(f, "masked\t{}", self.masked)?;
        writeln!(f, "masked_percent\t{:.2}", self.masked_percent())?;

        for reason in Reason::ALL {
            writeln!(f, "{}\t{}", reason.id(), self.failures(reason))?;
        }

        write!(f, "mean_depth\t{:.2}", self.mean_depth())
    }
}

#[cfg(test)]
mod tests {
    use nonempty::NonEmpty;

    use super::*;

    #[test]
    fn test_summarizes_verdicts() {
        let mut summary = Summary::default();

        summary.push(&Verdict::Pass, 30);
        summary.push(&Verdict::Fail(NonEmpty::new(Reason::NoCoverage)), 0);
        summary.push(
            &Verdict::Fail(NonEmpty::from((Reason::LowDepth, vec![Reason::AlleleBias]))),
            4,
        );
        summary.push(&Verdict::Pass, 26);

        assert_eq!(summary.positions(), 4);
        assert_eq!(summary.masked(), 2);
        assert_eq!(summary.failures(Reason::AlleleBias), 1);
        assert_eq!(summary.masked_percent(), 50.0);
        assert_eq!(summary.mean_depth(), 15.0);

        assert_eq!(
            summary.to_string(),
            "positions\t4\nmasked\t2\nmasked_percent\t50.00\nNO_COVERAGE\t1\nLOW_DEPTH\t1\n\
             ALLELE_BIAS\t1\nmean_depth\t15.00"
        );
    }
}
