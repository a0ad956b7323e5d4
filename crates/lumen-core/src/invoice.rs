//! # Invoice Number Generation
//!
//! Produces the human-readable, date-stamped identifiers for sale and
//! purchase headers: `INV-20260830-0481`, `PUR-20260830-7302`.
//!
//! ## Scheme
//! ```text
//! <PREFIX>-<YYYYMMDD>-<NNNN>
//!    │         │        └── random 0..=9999, zero-padded
//!    │         └── generation date (UTC)
//!    └── INV for sales, PUR for purchases
//! ```
//!
//! This is probabilistic uniqueness, not a sequence: the caller must check
//! each candidate against the persisted header table inside its transaction
//! and draw again on collision. [`InvoiceSequence`] bounds that loop: after
//! [`MAX_INVOICE_ATTEMPTS`](crate::MAX_INVOICE_ATTEMPTS) random candidates
//! it switches to fallback candidates that append a process-wide monotonic
//! counter, so the loop terminates even on a pathological date.

use chrono::{NaiveDate, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::MAX_INVOICE_ATTEMPTS;

/// Fallback candidates allowed after the random attempts are exhausted.
/// Each carries a fresh counter value, so more than one collision here
/// means the datastore is lying to us.
const MAX_FALLBACK_ATTEMPTS: u32 = 4;

/// Process-wide counter for fallback candidates.
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Invoice Prefix
// =============================================================================

/// Which header table an invoice number is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoicePrefix {
    /// Sales: `INV-...`
    Sale,
    /// Purchases: `PUR-...`
    Purchase,
}

impl InvoicePrefix {
    /// The literal prefix segment.
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoicePrefix::Sale => "INV",
            InvoicePrefix::Purchase => "PUR",
        }
    }
}

/// Formats a candidate for a given date and random draw. Pure; the
/// clock-and-RNG wiring lives in [`InvoiceSequence`].
pub fn format_candidate(prefix: InvoicePrefix, date: NaiveDate, random: u16) -> String {
    format!(
        "{}-{}-{:04}",
        prefix.as_str(),
        date.format("%Y%m%d"),
        random
    )
}

// =============================================================================
// Invoice Sequence
// =============================================================================

/// A capped stream of invoice-number candidates for one transaction.
///
/// ## Usage (inside the engine's database transaction)
/// ```rust
/// use lumen_core::invoice::{InvoicePrefix, InvoiceSequence};
///
/// let mut seq = InvoiceSequence::new(InvoicePrefix::Sale);
/// while let Some(candidate) = seq.next_candidate() {
///     let taken = false; // SELECT 1 FROM sales WHERE invoice_number = ?
///     if !taken {
///         break;
///     }
/// }
/// ```
///
/// `next_candidate` yields `MAX_INVOICE_ATTEMPTS` random candidates, then
/// `MAX_FALLBACK_ATTEMPTS` counter-suffixed ones, then `None`. A caller that
/// drains the stream reports `CoreError::InvoiceExhausted`.
#[derive(Debug)]
pub struct InvoiceSequence {
    prefix: InvoicePrefix,
    attempts: u32,
}

impl InvoiceSequence {
    /// Starts a fresh candidate stream.
    pub fn new(prefix: InvoicePrefix) -> Self {
        InvoiceSequence {
            prefix,
            attempts: 0,
        }
    }

    /// Yields the next candidate, or `None` once the cap is reached.
    pub fn next_candidate(&mut self) -> Option<String> {
        if self.attempts >= MAX_INVOICE_ATTEMPTS + MAX_FALLBACK_ATTEMPTS {
            return None;
        }

        self.attempts += 1;
        let today = Utc::now().date_naive();
        let random: u16 = rand::thread_rng().gen_range(0..10_000);

        if self.attempts <= MAX_INVOICE_ATTEMPTS {
            Some(format_candidate(self.prefix, today, random))
        } else {
            // Random space looked saturated; make the candidate unique by
            // construction with a monotonic counter segment.
            let seq = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);
            Some(format!(
                "{}-{}",
                format_candidate(self.prefix, today, random),
                seq
            ))
        }
    }

    /// Candidates handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
