//! Recipient rows and the editable session that owns them.

use crate::address::is_valid_address;
use crate::amount::{check_human, sum_human};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, stable key of a recipient row.
///
/// Ids are never reused within a session, so results keyed by id stay
/// unambiguous after rows are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecipientId(pub u64);

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One payment row as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientEntry {
    pub id: RecipientId,
    pub address: String,
    /// Human decimal amount, e.g. `"12.5"`.
    pub amount: String,
    #[serde(default)]
    pub memo: String,
}

/// Live feedback state of a row's address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressState {
    Empty,
    Valid,
    Invalid,
}

impl RecipientEntry {
    pub fn new(id: RecipientId, address: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            amount: amount.into(),
            memo: String::new(),
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn address_state(&self) -> AddressState {
        if self.address.is_empty() {
            AddressState::Empty
        } else if is_valid_address(&self.address) {
            AddressState::Valid
        } else {
            AddressState::Invalid
        }
    }

    /// A row is complete once both address and amount are filled in.
    ///
    /// Whitespace counts as input, as in [`address_state`](Self::address_state):
    /// a row of spaces is submitted and then rejected, never skipped.
    pub fn is_complete(&self) -> bool {
        !self.address.is_empty() && !self.amount.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.address.is_empty() && self.amount.is_empty() && self.memo.is_empty()
    }
}

/// Headline numbers for a set of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Rows with both an address and an amount.
    pub filled_rows: usize,
    /// Exact decimal total of the filled rows with positive amounts.
    pub total: String,
}

/// The caller's editable list of recipient rows.
///
/// Always holds at least one row; removing the last row is refused.
#[derive(Debug, Clone)]
pub struct RecipientSession {
    rows: Vec<RecipientEntry>,
    next_id: u64,
    /// True until the first edit of a freshly created session.
    untouched: bool,
}

impl Default for RecipientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecipientSession {
    /// Create a session with a single blank row.
    pub fn new() -> Self {
        let mut session = Self {
            rows: Vec::new(),
            next_id: 0,
            untouched: true,
        };
        session.add_row();
        session.untouched = true;
        session
    }

    /// Append a blank row and return its id.
    pub fn add_row(&mut self) -> RecipientId {
        self.untouched = false;
        let id = self.allocate_id();
        self.rows.push(RecipientEntry::new(id, "", ""));
        id
    }

    /// Append a pre-filled row and return its id.
    ///
    /// The first push into a session fresh from [`new`](Self::new) fills its
    /// placeholder row instead. Blank rows added afterwards, including the
    /// one left by [`reset`](Self::reset), are kept.
    pub fn push(&mut self, address: impl Into<String>, amount: impl Into<String>) -> RecipientId {
        if std::mem::take(&mut self.untouched) {
            if let [only] = self.rows.as_mut_slice() {
                only.address = address.into();
                only.amount = amount.into();
                return only.id;
            }
        }

        let id = self.allocate_id();
        self.rows.push(RecipientEntry::new(id, address, amount));
        id
    }

    /// Remove a row. Returns false if the row is unknown or is the last one.
    pub fn remove_row(&mut self, id: RecipientId) -> bool {
        if self.rows.len() <= 1 {
            return false;
        }
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        self.rows.len() != before
    }

    pub fn update_address(&mut self, id: RecipientId, address: impl Into<String>) -> bool {
        self.row_mut(id).map(|row| row.address = address.into()).is_some()
    }

    pub fn update_amount(&mut self, id: RecipientId, amount: impl Into<String>) -> bool {
        self.row_mut(id).map(|row| row.amount = amount.into()).is_some()
    }

    pub fn update_memo(&mut self, id: RecipientId, memo: impl Into<String>) -> bool {
        self.row_mut(id).map(|row| row.memo = memo.into()).is_some()
    }

    /// Discard every row and start over with one blank row.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.add_row();
    }

    pub fn rows(&self) -> &[RecipientEntry] {
        &self.rows
    }

    pub fn get(&self, id: RecipientId) -> Option<&RecipientEntry> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Count filled rows and total their amounts.
    ///
    /// Rows whose amount is not a positive number are counted but excluded
    /// from the total.
    pub fn summary(&self) -> BatchSummary {
        let filled: Vec<&RecipientEntry> = self.rows.iter().filter(|r| r.is_complete()).collect();
        let amounts = filled.iter().filter_map(|r| check_human(&r.amount).ok());
        let total = sum_human(amounts).unwrap_or_else(|_| "0".to_string());

        BatchSummary {
            filled_rows: filled.len(),
            total,
        }
    }

    fn row_mut(&mut self, id: RecipientId) -> Option<&mut RecipientEntry> {
        self.untouched = false;
        self.rows.iter_mut().find(|row| row.id == id)
    }

    fn allocate_id(&mut self) -> RecipientId {
        let id = RecipientId(self.next_id);
        self.next_id += 1;
        id
    }
}
