use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::text_enum;
use crate::internal_error::{InternalError, InternalResult};
use crate::validation::{trim, Validate, Violations};

pub type FinanceEntryID = i64;

pub const DEFAULT_CATEGORY: &str = "general";

pub const MIN_AMOUNT: f64 = 0.01;
pub const MAX_AMOUNT: f64 = 1_000_000.0;

text_enum!(FinanceType {
    Income => "income",
    Expense => "expense",
});

text_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    Bank => "bank",
    Savings => "savings",
});

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinanceEntry {
    pub id: FinanceEntryID,
    #[serde(rename = "type")]
    pub kind: FinanceType,
    pub title: String,
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FinanceEntryInput {
    #[serde(rename = "type")]
    pub kind: FinanceType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl Validate for FinanceEntryInput {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.title);
        trim(&mut self.description);
        trim(&mut self.category);
        if self.category.is_empty() {
            self.category = String::from(DEFAULT_CATEGORY);
        }

        let mut violations = Violations::new();
        violations.length("title", &self.title, 1, 200);
        violations.length("description", &self.description, 0, 1000);
        violations.range("amount", self.amount, MIN_AMOUNT, MAX_AMOUNT);
        violations.length("category", &self.category, 1, 100);
        violations.finish()
    }
}

pub fn finance_entry_not_found() -> InternalError {
    InternalError::NotFound {
        entity: "Finance entry",
        code: "FINANCE_ENTRY_NOT_FOUND",
    }
}

impl FinanceEntry {
    /// An entry that has not been stored yet (`id` is 0).
    pub fn new(input: FinanceEntryInput, now: DateTime<Utc>) -> FinanceEntry {
        FinanceEntry {
            id: 0,
            kind: input.kind,
            title: input.title,
            description: input.description,
            amount: input.amount,
            category: input.category,
            payment_method: input.payment_method,
            date: input.date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
        }
    }

    pub fn replace(&mut self, input: FinanceEntryInput, now: DateTime<Utc>) {
        let replacement = FinanceEntry::new(input, now);
        *self = FinanceEntry {
            id: self.id,
            created_at: self.created_at,
            ..replacement
        };
    }

    /// Amount with its sign: expenses count negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            FinanceType::Income => self.amount,
            FinanceType::Expense => -self.amount,
        }
    }
}
