//! The fixed five-pass pipeline.
//!
//! Each pass walks the still-unmatched statement lines in input order and
//! collects the unclaimed invoices its rule accepts, in invoice order. Exactly
//! one candidate is claimed on the spot and leaves the pool; two or more
//! never resolve, and the line falls through to the next pass.

use crate::config::{MatchOptions, ToleranceConfig};
use crate::matcher::{
    amount_within_tolerance, amounts_equal, dates_equal_when_present, dates_within_window,
    exact_document_match, grouped_document_match, normalized_document_match,
};
use crate::model::{Invoice, MatchMode, Pass, StatementLine};

// ---------------------------------------------------------------------------
// Pass rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRule {
    Exact,
    Normalized,
    /// Normalized equality, or any segment of a multi-document reference.
    NormalizedOrGrouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountRule {
    Exact,
    Tolerance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    Ignored,
    /// Equal when both dates exist; a missing date is skipped.
    EqualWhenPresent,
    /// Both dates required and within the window.
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassRule {
    pub pass: Pass,
    pub document: DocumentRule,
    pub amount: AmountRule,
    pub date: DateRule,
}

pub const PASS_RULES: [PassRule; 5] = [
    PassRule {
        pass: Pass::Exact,
        document: DocumentRule::Exact,
        amount: AmountRule::Exact,
        date: DateRule::EqualWhenPresent,
    },
    PassRule {
        pass: Pass::DateWindow,
        document: DocumentRule::Exact,
        amount: AmountRule::Exact,
        date: DateRule::Window,
    },
    PassRule {
        pass: Pass::NormalizedReference,
        document: DocumentRule::Normalized,
        amount: AmountRule::Exact,
        date: DateRule::Ignored,
    },
    PassRule {
        pass: Pass::AmountTolerance,
        document: DocumentRule::Exact,
        amount: AmountRule::Tolerance,
        date: DateRule::Ignored,
    },
    PassRule {
        pass: Pass::Partial,
        document: DocumentRule::NormalizedOrGrouped,
        amount: AmountRule::Tolerance,
        date: DateRule::Window,
    },
];

impl PassRule {
    pub fn accepts(&self, line: &StatementLine, invoice: &Invoice, tolerance: &ToleranceConfig) -> bool {
        let reference = &line.reference_text;
        let number = &invoice.invoice_number;

        let document = match self.document {
            DocumentRule::Exact => exact_document_match(reference, number),
            DocumentRule::Normalized => normalized_document_match(reference, number),
            DocumentRule::NormalizedOrGrouped => {
                normalized_document_match(reference, number) || grouped_document_match(reference, number)
            }
        };
        if !document {
            return false;
        }

        let amount = match self.amount {
            AmountRule::Exact => amounts_equal(line, invoice),
            AmountRule::Tolerance => amount_within_tolerance(line, invoice, tolerance),
        };
        if !amount {
            return false;
        }

        match self.date {
            DateRule::Ignored => true,
            DateRule::EqualWhenPresent => dates_equal_when_present(line.line_date, invoice.invoice_date),
            DateRule::Window => {
                dates_within_window(line.line_date, invoice.invoice_date, tolerance.date_window_days)
            }
        }
    }
}

/// Pass 5 runs for a line tagged `partial`, or for every line when the run
/// enables it.
pub fn partial_enabled(line: &StatementLine, allow_partial: bool) -> bool {
    allow_partial || line.match_mode == MatchMode::Partial
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub invoice_index: usize,
    pub pass: Pass,
}

/// A pass that found more than one eligible invoice for a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub pass: Pass,
    /// Invoice indices, in input order.
    pub candidates: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOutcome {
    pub claim: Option<Claim>,
    /// The last pass that saw several candidates for this line.
    pub ambiguity: Option<Ambiguity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// One per statement line, in input order.
    pub outcomes: Vec<LineOutcome>,
    /// One per invoice: the statement line that claimed it.
    pub claimed_by: Vec<Option<usize>>,
}

impl PipelineOutput {
    pub fn matched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.claim.is_some()).count()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

pub fn run_passes(lines: &[StatementLine], invoices: &[Invoice], options: &MatchOptions) -> PipelineOutput {
    let mut outcomes = vec![LineOutcome::default(); lines.len()];
    let mut claimed_by: Vec<Option<usize>> = vec![None; invoices.len()];

    for rule in &PASS_RULES {
        let mut claimed = 0usize;
        let mut ambiguous = 0usize;

        for (line_index, line) in lines.iter().enumerate() {
            if outcomes[line_index].claim.is_some() {
                continue;
            }
            if rule.pass == Pass::Partial && !partial_enabled(line, options.allow_partial) {
                continue;
            }

            let candidates: Vec<usize> = invoices
                .iter()
                .enumerate()
                .filter(|(i, inv)| claimed_by[*i].is_none() && rule.accepts(line, inv, &options.tolerance))
                .map(|(i, _)| i)
                .collect();

            match candidates.as_slice() {
                [] => {}
                [only] => {
                    claimed_by[*only] = Some(line_index);
                    outcomes[line_index].claim = Some(Claim {
                        invoice_index: *only,
                        pass: rule.pass,
                    });
                    claimed += 1;
                    log::trace!(
                        "pass {}: statement line #{} claims invoice '{}'",
                        rule.pass.number(),
                        line_index + 1,
                        invoices[*only].invoice_number
                    );
                }
                _ => {
                    ambiguous += 1;
                    outcomes[line_index].ambiguity = Some(Ambiguity {
                        pass: rule.pass,
                        candidates,
                    });
                }
            }
        }

        log::debug!(
            "pass {} ({}): {} claimed, {} ambiguous",
            rule.pass.number(),
            rule.pass,
            claimed,
            ambiguous
        );
    }

    PipelineOutput { outcomes, claimed_by }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn claim_pass(out: &PipelineOutput, line: usize) -> Option<Pass> {
        out.outcomes[line].claim.map(|c| c.pass)
    }

    #[test]
    fn rules_are_in_pass_order() {
        let passes: Vec<Pass> = PASS_RULES.iter().map(|r| r.pass).collect();
        assert_eq!(passes, Pass::ALL.to_vec());
    }

    #[test]
    fn exact_match_lands_in_pass_one() {
        let lines = vec![StatementLine::new("INV-100", d("500.00"), "USD").dated(date(2025, 1, 10))];
        let invoices = vec![Invoice::new("INV-100", d("500.00"), "USD").dated(date(2025, 1, 10))];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::Exact));
        assert_eq!(out.claimed_by, vec![Some(0)]);
    }

    #[test]
    fn shifted_date_lands_in_pass_two() {
        let lines = vec![StatementLine::new("INV-100", d("500.00"), "USD").dated(date(2025, 1, 15))];
        let invoices = vec![Invoice::new("INV-100", d("500.00"), "USD").dated(date(2025, 1, 10))];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::DateWindow));
    }

    #[test]
    fn fuzzy_reference_lands_in_pass_three() {
        let lines = vec![StatementLine::new("inv42", d("200.00"), "USD")];
        let invoices = vec![Invoice::new("INV-0042", d("200.00"), "USD")];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::NormalizedReference));
    }

    #[test]
    fn near_amount_lands_in_pass_four() {
        let lines = vec![StatementLine::new("INV-7", d("995.50"), "USD")];
        let invoices = vec![Invoice::new("INV-7", d("1000.00"), "USD")];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::AmountTolerance));
    }

    #[test]
    fn claimed_invoice_leaves_the_pool() {
        let lines = vec![
            StatementLine::new("INV-1", d("10.00"), "USD"),
            StatementLine::new("INV-1", d("10.00"), "USD"),
        ];
        let invoices = vec![Invoice::new("INV-1", d("10.00"), "USD")];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::Exact));
        assert_eq!(out.outcomes[1].claim, None);
        assert_eq!(out.matched_count(), 1);
    }

    #[test]
    fn two_candidates_never_resolve() {
        let lines = vec![StatementLine::new("INV-1", d("10.00"), "USD")];
        let invoices = vec![
            Invoice::new("INV-1", d("10.00"), "USD"),
            Invoice::new("inv-1", d("10.00"), "USD"),
        ];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(out.outcomes[0].claim, None);
        let amb = out.outcomes[0].ambiguity.as_ref().unwrap();
        assert_eq!(amb.candidates, vec![0, 1]);
        assert_eq!(out.claimed_by, vec![None, None]);
    }

    #[test]
    fn partial_pass_needs_opt_in() {
        // Normalized reference plus an inexact amount: only pass 5 accepts it.
        let line = StatementLine::new("inv 42", d("199.50"), "USD").dated(date(2025, 3, 3));
        let invoices = vec![Invoice::new("INV-0042", d("200.00"), "USD").dated(date(2025, 3, 1))];

        let out = run_passes(&[line.clone()], &invoices, &MatchOptions::default());
        assert_eq!(out.outcomes[0].claim, None);

        let out = run_passes(&[line.clone().partial()], &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::Partial));

        let options = MatchOptions {
            allow_partial: true,
            ..MatchOptions::default()
        };
        let out = run_passes(&[line], &invoices, &options);
        assert_eq!(claim_pass(&out, 0), Some(Pass::Partial));
    }

    #[test]
    fn partial_pass_accepts_grouped_reference() {
        let lines = vec![StatementLine::new("PMT INV-41 / INV-42", d("200.00"), "USD")
            .dated(date(2025, 3, 3))
            .partial()];
        let invoices = vec![Invoice::new("INV-42", d("200.00"), "USD").dated(date(2025, 3, 1))];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::Partial));
    }

    #[test]
    fn partial_pass_requires_both_dates() {
        let lines = vec![StatementLine::new("inv 42", d("199.50"), "USD").partial()];
        let invoices = vec![Invoice::new("INV-0042", d("200.00"), "USD").dated(date(2025, 3, 1))];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(out.outcomes[0].claim, None);
    }

    #[test]
    fn currencies_never_cross() {
        let lines = vec![StatementLine::new("INV-1", d("10.00"), "EUR").partial()];
        let invoices = vec![Invoice::new("INV-1", d("10.00"), "USD")];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(out.outcomes[0].claim, None);
    }

    #[test]
    fn earlier_line_wins_within_a_pass() {
        let lines = vec![
            StatementLine::new("INV-9", d("99.50"), "USD"),
            StatementLine::new("INV-9", d("100.40"), "USD"),
        ];
        let invoices = vec![Invoice::new("INV-9", d("100.00"), "USD")];
        let out = run_passes(&lines, &invoices, &MatchOptions::default());
        assert_eq!(claim_pass(&out, 0), Some(Pass::AmountTolerance));
        assert_eq!(out.outcomes[1].claim, None);
    }
}
