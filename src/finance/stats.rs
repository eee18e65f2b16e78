use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use std::collections::{BTreeMap, HashMap};

use super::data::{FinanceEntry, FinanceType, PaymentMethod};

const TOP_CATEGORIES: usize = 5;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Income and expense totals of some slice of entries.
#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct Flow {
    pub income: f64,
    pub expenses: f64,
}

impl Flow {
    fn add(&mut self, entry: &FinanceEntry) {
        match entry.kind {
            FinanceType::Income => self.income += entry.amount,
            FinanceType::Expense => self.expenses += entry.amount,
        }
    }

    pub fn net(&self) -> f64 {
        self.income - self.expenses
    }

    fn rounded(self) -> Flow {
        Flow {
            income: cents(self.income),
            expenses: cents(self.expenses),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct MonthFlow {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
}

impl From<Flow> for MonthFlow {
    fn from(flow: Flow) -> MonthFlow {
        let flow = flow.rounded();
        MonthFlow {
            income: flow.income,
            expenses: flow.expenses,
            net: cents(flow.net()),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub month: &'static str,
    pub income: f64,
    pub expenses: f64,
    pub balance: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinanceStats {
    pub total_entries: usize,
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub current_month: MonthFlow,
    pub top_categories: Vec<CategoryTotal>,
    pub by_payment_method: BTreeMap<&'static str, Flow>,
    pub monthly_trend: Vec<TrendPoint>,
}

pub fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Largest expense categories, ties ordered by name.
pub fn top_expense_categories(entries: &[FinanceEntry], count: usize) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for entry in entries.iter().filter(|entry| entry.kind == FinanceType::Expense) {
        *totals.entry(entry.category.as_str()).or_insert(0.0) += entry.amount;
    }

    let mut totals: Vec<_> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
        .into_iter()
        .take(count)
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount: cents(amount),
        })
        .collect()
}

/// One point per month of `year`, January first.
pub fn monthly_trend(entries: &[FinanceEntry], year: i32) -> Vec<TrendPoint> {
    let mut months = [Flow::default(); 12];
    for entry in entries.iter().filter(|entry| entry.date.year() == year) {
        months[entry.date.month0() as usize].add(entry);
    }

    MONTH_NAMES
        .iter()
        .zip(months.iter())
        .map(|(month, flow)| TrendPoint {
            month: *month,
            income: cents(flow.income),
            expenses: cents(flow.expenses),
            balance: cents(flow.net()),
        })
        .collect()
}

pub fn finance_stats(entries: &[FinanceEntry], today: NaiveDate) -> FinanceStats {
    let mut total = Flow::default();
    let mut current_month = Flow::default();
    let mut by_payment_method: BTreeMap<&'static str, Flow> = PaymentMethod::ALL
        .iter()
        .map(|method| (method.as_str(), Flow::default()))
        .collect();

    for entry in entries {
        total.add(entry);
        if entry.date.year() == today.year() && entry.date.month() == today.month() {
            current_month.add(entry);
        }
        if let Some(flow) = by_payment_method.get_mut(entry.payment_method.as_str()) {
            flow.add(entry);
        }
    }

    FinanceStats {
        total_entries: entries.len(),
        total_income: cents(total.income),
        total_expenses: cents(total.expenses),
        balance: cents(total.net()),
        current_month: current_month.into(),
        top_categories: top_expense_categories(entries, TOP_CATEGORIES),
        by_payment_method: by_payment_method
            .into_iter()
            .map(|(method, flow)| (method, flow.rounded()))
            .collect(),
        monthly_trend: monthly_trend(entries, today.year()),
    }
}
