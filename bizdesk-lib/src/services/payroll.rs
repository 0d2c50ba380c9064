//! Payroll periods and records

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::impl_fields;
use super::impl_value_from_enum;
use super::logged;
use crate::BizdeskClient;
use crate::api::TableRecord;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::calc::payroll::PayBreakdown;
use crate::calc::payroll::PayInputs;
use crate::calc::payroll::PeriodTotals;
use crate::calc::payroll::compute_pay;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::validation;
use crate::validation::codes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    #[default]
    Open,
    Closed,
}

impl PeriodStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodStatus::Open => "open",
            PeriodStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl_value_from_enum!(PeriodStatus, PaymentStatus);

// =============================================================================
// Records
// =============================================================================

/// A `payroll_periods` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub pay_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: PeriodStatus,
    #[serde(default)]
    pub total_gross: Decimal,
    #[serde(default)]
    pub total_deductions: Decimal,
    #[serde(default)]
    pub total_net: Decimal,
    #[serde(default)]
    pub employee_count: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TableRecord for PayrollPeriod {
    const TABLE: &'static str = "payroll_periods";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(PayrollPeriod {
    id,
    name,
    start_date,
    end_date,
    pay_date,
    status,
    total_gross,
    total_net,
    employee_count,
});

/// A `payroll_records` row: one employee's pay for one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub period_id: Uuid,
    #[serde(default)]
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    #[serde(default)]
    pub position: Option<String>,
    pub base_salary: Decimal,
    #[serde(default)]
    pub overtime_hours: Decimal,
    #[serde(default)]
    pub overtime_rate: Decimal,
    #[serde(default)]
    pub bonus: Decimal,
    #[serde(default)]
    pub allowances: Decimal,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub benefits: Decimal,
    #[serde(default)]
    pub other_deductions: Decimal,
    pub gross_pay: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PayrollRecord {
    pub fn inputs(&self) -> PayInputs {
        PayInputs {
            base_salary: self.base_salary,
            overtime_hours: self.overtime_hours,
            overtime_rate: self.overtime_rate,
            bonus: self.bonus,
            allowances: self.allowances,
            tax: self.tax,
            benefits: self.benefits,
            other_deductions: self.other_deductions,
        }
    }
}

impl TableRecord for PayrollRecord {
    const TABLE: &'static str = "payroll_records";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(PayrollRecord {
    id,
    period_id,
    employee_id,
    employee_name,
    position,
    base_salary,
    gross_pay,
    total_deductions,
    net_pay,
    payment_status,
});

// =============================================================================
// Payloads
// =============================================================================

/// Input for [`Payroll::create_period`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPeriod {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pay_date: Option<NaiveDate>,
}

impl NewPeriod {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "name", Some(self.name.as_str()));
        if self.end_date < self.start_date {
            errors.push_code("end_date", "End date cannot be before the start date", codes::DATE_ORDER);
        }
        if self.pay_date.is_some_and(|pay| pay < self.start_date) {
            errors.push_code("pay_date", "Pay date cannot be before the start date", codes::DATE_ORDER);
        }
        errors.into_result()
    }
}

/// Input for [`Payroll::create_record`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewPayrollRecord {
    pub employee_id: Option<Uuid>,
    pub employee_name: String,
    pub position: Option<String>,
    pub pay: PayInputs,
    pub notes: Option<String>,
}

/// Changes for [`Payroll::update_record`]. Unset fields keep their value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PayrollRecordPatch {
    pub employee_name: Option<String>,
    pub position: Option<Option<String>>,
    pub base_salary: Option<Decimal>,
    pub overtime_hours: Option<Decimal>,
    pub overtime_rate: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub allowances: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub benefits: Option<Decimal>,
    pub other_deductions: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<Option<String>>,
}

impl PayrollRecordPatch {
    fn apply(&self, pay: PayInputs) -> PayInputs {
        PayInputs {
            base_salary: self.base_salary.unwrap_or(pay.base_salary),
            overtime_hours: self.overtime_hours.unwrap_or(pay.overtime_hours),
            overtime_rate: self.overtime_rate.unwrap_or(pay.overtime_rate),
            bonus: self.bonus.unwrap_or(pay.bonus),
            allowances: self.allowances.unwrap_or(pay.allowances),
            tax: self.tax.unwrap_or(pay.tax),
            benefits: self.benefits.unwrap_or(pay.benefits),
            other_deductions: self.other_deductions.unwrap_or(pay.other_deductions),
        }
    }
}

#[derive(Serialize)]
struct PayColumns {
    base_salary: Decimal,
    overtime_hours: Decimal,
    overtime_rate: Decimal,
    bonus: Decimal,
    allowances: Decimal,
    tax: Decimal,
    benefits: Decimal,
    other_deductions: Decimal,
    gross_pay: Decimal,
    total_deductions: Decimal,
    net_pay: Decimal,
}

impl PayColumns {
    fn new(pay: &PayInputs, breakdown: &PayBreakdown) -> Self {
        Self {
            base_salary: pay.base_salary,
            overtime_hours: pay.overtime_hours,
            overtime_rate: pay.overtime_rate,
            bonus: pay.bonus,
            allowances: pay.allowances,
            tax: pay.tax,
            benefits: pay.benefits,
            other_deductions: pay.other_deductions,
            gross_pay: breakdown.gross_pay,
            total_deductions: breakdown.total_deductions,
            net_pay: breakdown.net_pay,
        }
    }
}

#[derive(Serialize)]
struct RecordRow<'a> {
    period_id: Uuid,
    employee_id: Option<Uuid>,
    employee_name: &'a str,
    position: Option<&'a str>,
    notes: Option<&'a str>,
    payment_status: PaymentStatus,
    #[serde(flatten)]
    pay: PayColumns,
}

/// Validates pay inputs and computes the breakdown.
fn checked_pay(pay: &PayInputs, errors: &mut ValidationErrors) -> PayBreakdown {
    let amounts = [
        ("base_salary", pay.base_salary),
        ("overtime_hours", pay.overtime_hours),
        ("overtime_rate", pay.overtime_rate),
        ("bonus", pay.bonus),
        ("allowances", pay.allowances),
        ("tax", pay.tax),
        ("benefits", pay.benefits),
        ("other_deductions", pay.other_deductions),
    ];
    for (field, amount) in amounts {
        validation::require_non_negative(errors, field, amount);
    }
    match compute_pay(pay) {
        Some(breakdown) => {
            if breakdown.net_pay < Decimal::ZERO {
                errors.push_code("net_pay", "Deductions exceed gross pay", codes::NON_NEGATIVE);
            }
            breakdown
        }
        None => {
            errors.push_code("gross_pay", "Amount is too large", codes::OUT_OF_RANGE);
            PayBreakdown::default()
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Payroll operations.
pub struct Payroll<'a> {
    client: &'a BizdeskClient,
}

impl<'a> Payroll<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    // =========================================================================
    // Periods
    // =========================================================================

    /// Periods, most recent first.
    pub async fn list_periods(&self) -> Result<Vec<PayrollPeriod>, Error> {
        let query = Query::new().order(OrderBy::desc("start_date"));
        logged("list payroll periods", self.client.list::<PayrollPeriod>(&query).await)
    }

    pub async fn get_period(&self, id: Uuid) -> Result<PayrollPeriod, Error> {
        logged("get payroll period", self.client.get_by_id::<PayrollPeriod>(id).await)
    }

    pub async fn create_period(&self, new: &NewPeriod) -> Result<PayrollPeriod, Error> {
        new.validate()?;
        let row = json!({
            "name": new.name.trim(),
            "start_date": new.start_date,
            "end_date": new.end_date,
            "pay_date": new.pay_date,
            "status": PeriodStatus::Open,
        });
        logged("create payroll period", self.client.insert(&row).await)
    }

    /// Freezes a period and stores its totals.
    pub async fn close_period(&self, id: Uuid) -> Result<PayrollPeriod, Error> {
        let period = self.get_period(id).await?;
        if period.status == PeriodStatus::Closed {
            return Err(Error::business(format!("Payroll period {} is already closed", period.name)));
        }
        let totals = self.period_totals(id).await?;
        let patch = json!({
            "status": PeriodStatus::Closed,
            "total_gross": totals.gross_pay,
            "total_deductions": totals.total_deductions,
            "total_net": totals.net_pay,
            "employee_count": totals.employees,
        });
        logged("close payroll period", self.client.update::<PayrollPeriod, _>(id, &patch).await)
    }

    /// Sums the records of a period, recomputing each record's pay.
    pub async fn period_totals(&self, period_id: Uuid) -> Result<PeriodTotals, Error> {
        let records = self.list_records(period_id).await?;
        let breakdowns: Option<Vec<PayBreakdown>> = records
            .iter()
            .map(|record| compute_pay(&record.inputs()))
            .collect();
        breakdowns
            .as_deref()
            .and_then(PeriodTotals::try_sum)
            .ok_or_else(|| Error::InvalidOperation(format!("payroll totals for period {period_id} are out of range")))
    }

    async fn open_period(&self, id: Uuid) -> Result<PayrollPeriod, Error> {
        let period = self.get_period(id).await?;
        if period.status == PeriodStatus::Closed {
            return Err(Error::business(format!(
                "Payroll period {} is closed and cannot be changed",
                period.name
            )));
        }
        Ok(period)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Records of a period ordered by employee name.
    pub async fn list_records(&self, period_id: Uuid) -> Result<Vec<PayrollRecord>, Error> {
        let query = Query::new()
            .filter(Filter::eq("period_id", period_id))
            .order(OrderBy::asc("employee_name"));
        logged("list payroll records", self.client.list::<PayrollRecord>(&query).await)
    }

    pub async fn create_record(&self, period_id: Uuid, new: &NewPayrollRecord) -> Result<PayrollRecord, Error> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "employee_name", Some(new.employee_name.as_str()));
        let breakdown = checked_pay(&new.pay, &mut errors);
        errors.into_result()?;

        self.open_period(period_id).await?;

        let row = RecordRow {
            period_id,
            employee_id: new.employee_id,
            employee_name: new.employee_name.trim(),
            position: validation::non_blank(new.position.as_deref()),
            notes: validation::non_blank(new.notes.as_deref()),
            payment_status: PaymentStatus::Pending,
            pay: PayColumns::new(&new.pay, &breakdown),
        };
        logged("create payroll record", self.client.insert(&row).await)
    }

    /// Applies a patch and recomputes gross, deductions and net pay.
    pub async fn update_record(&self, id: Uuid, patch: &PayrollRecordPatch) -> Result<PayrollRecord, Error> {
        let record = logged("get payroll record", self.client.get_by_id::<PayrollRecord>(id).await)?;

        let pay = patch.apply(record.inputs());
        let mut errors = ValidationErrors::new();
        if let Some(name) = &patch.employee_name {
            validation::require_text(&mut errors, "employee_name", Some(name.as_str()));
        }
        let breakdown = checked_pay(&pay, &mut errors);
        errors.into_result()?;

        self.open_period(record.period_id).await?;

        let mut body = serde_json::to_value(PayColumns::new(&pay, &breakdown))?;
        if let Some(fields) = body.as_object_mut() {
            if let Some(name) = &patch.employee_name {
                fields.insert("employee_name".into(), name.trim().into());
            }
            if let Some(position) = &patch.position {
                fields.insert("position".into(), serde_json::to_value(position)?);
            }
            if let Some(status) = patch.payment_status {
                fields.insert("payment_status".into(), serde_json::to_value(status)?);
            }
            if let Some(notes) = &patch.notes {
                fields.insert("notes".into(), serde_json::to_value(notes)?);
            }
        }
        logged("update payroll record", self.client.update::<PayrollRecord, _>(id, &body).await)
    }

    pub async fn delete_record(&self, id: Uuid) -> Result<(), Error> {
        let record = logged("get payroll record", self.client.get_by_id::<PayrollRecord>(id).await)?;
        self.open_period(record.period_id).await?;
        logged("delete payroll record", self.client.delete::<PayrollRecord>(id).await)
    }

    /// Marks a record as paid. Allowed on closed periods.
    pub async fn mark_paid(&self, id: Uuid) -> Result<PayrollRecord, Error> {
        let patch = json!({ "payment_status": PaymentStatus::Paid });
        logged("mark payroll record paid", self.client.update::<PayrollRecord, _>(id, &patch).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fields;
    use crate::model::Value;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_period_dates_validated() {
        let period = NewPeriod {
            name: "March".into(),
            start_date: "2024-03-31".parse().unwrap(),
            end_date: "2024-03-01".parse().unwrap(),
            pay_date: None,
        };
        assert!(period.validate().unwrap_err().has_code("end_date", codes::DATE_ORDER));
    }

    #[test]
    fn test_checked_pay_rejects_negative_net() {
        let mut errors = ValidationErrors::new();
        let pay = PayInputs {
            base_salary: d("100"),
            tax: d("150"),
            ..PayInputs::default()
        };
        checked_pay(&pay, &mut errors);
        assert!(errors.has_code("net_pay", codes::NON_NEGATIVE));
    }

    #[test]
    fn test_checked_pay_rejects_overflow() {
        let mut errors = ValidationErrors::new();
        let pay = PayInputs {
            overtime_hours: Decimal::MAX,
            overtime_rate: d("2"),
            ..PayInputs::default()
        };
        checked_pay(&pay, &mut errors);
        assert!(errors.has_code("gross_pay", codes::OUT_OF_RANGE));
    }

    #[test]
    fn test_patch_merges_inputs() {
        let base = PayInputs {
            base_salary: d("1000"),
            bonus: d("50"),
            ..PayInputs::default()
        };
        let patch = PayrollRecordPatch {
            bonus: Some(d("75")),
            ..PayrollRecordPatch::default()
        };
        let merged = patch.apply(base);
        assert_eq!(merged.base_salary, d("1000"));
        assert_eq!(merged.bonus, d("75"));
    }

    #[test]
    fn test_record_row_flattens_pay() {
        let pay = PayInputs {
            base_salary: d("1000"),
            ..PayInputs::default()
        };
        let row = RecordRow {
            period_id: Uuid::nil(),
            employee_id: None,
            employee_name: "Ada",
            position: None,
            notes: None,
            payment_status: PaymentStatus::Pending,
            pay: PayColumns::new(&pay, &compute_pay(&pay).unwrap()),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["employee_name"], "Ada");
        assert!(json.get("net_pay").is_some());
        assert_eq!(json["payment_status"], "pending");
    }

    #[test]
    fn test_record_fields() {
        let record: PayrollRecord = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "period_id": "00000000-0000-0000-0000-000000000002",
            "employee_name": "Ada",
            "base_salary": 1000,
            "gross_pay": 1000,
            "total_deductions": 100,
            "net_pay": 900
        }))
        .unwrap();
        assert_eq!(record.payment_status, PaymentStatus::Pending);
        assert_eq!(record.field("payment_status"), Some(Value::from("pending")));
        assert_eq!(compute_pay(&record.inputs()).unwrap().gross_pay, d("1000"));
    }
}
