//! Bill operations

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::bill_filter::BillFilter;
use super::{date_column, decimal_column, money_text, parse_datetime, Database, DbConn};
use crate::error::{Error, Result};
use crate::models::{
    round_money, Bill, BillCorrection, BillItem, BillStats, BillStatus, CorrectableField, NewBill,
};

const BILL_COLUMNS: &str = "b.id, b.user_id, b.bill_number, b.vendor_name, b.date, b.total_amount, \
     b.tax_amount, b.status, b.notes, b.created_at, b.updated_at";

fn validate_new_bill(bill: &NewBill) -> Result<()> {
    if bill.total_amount < Decimal::ZERO {
        return Err(Error::Validation(
            "Bill total amount cannot be negative".to_string(),
        ));
    }
    if bill.tax_amount < Decimal::ZERO {
        return Err(Error::Validation(
            "Bill tax amount cannot be negative".to_string(),
        ));
    }
    for item in &bill.items {
        if item.name.trim().is_empty() {
            return Err(Error::Validation("Bill item name is required".to_string()));
        }
        if item.quantity < Decimal::ZERO {
            return Err(Error::Validation(format!(
                "Quantity for item '{}' cannot be negative",
                item.name
            )));
        }
    }
    Ok(())
}

impl Database {
    /// Record a bill and its line items atomically
    pub fn create_bill(&self, user_id: i64, bill: &NewBill) -> Result<Bill> {
        validate_new_bill(bill)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO bills (user_id, bill_number, vendor_name, date, total_amount, tax_amount, status, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                bill.bill_number.trim(),
                bill.vendor_name.trim(),
                bill.date.map(|d| d.to_string()),
                money_text(bill.total_amount),
                money_text(bill.tax_amount),
                bill.status.as_str(),
                bill.notes,
            ],
        )?;
        let bill_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO bill_items (bill_id, name, quantity, unit_price, total_price, category)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for item in &bill.items {
                stmt.execute(params![
                    bill_id,
                    item.name.trim(),
                    money_text(item.quantity),
                    money_text(item.unit_price),
                    money_text(item.total_price),
                    item.category,
                ])?;
            }
        }

        tx.commit()?;

        info!(bill_id, user_id, items = bill.items.len(), "Recorded bill");

        self.get_bill(user_id, bill_id)?
            .ok_or_else(|| Error::NotFound(format!("Bill {} vanished after insert", bill_id)))
    }

    /// Get a bill (with items) owned by `user_id`
    pub fn get_bill(&self, user_id: i64, bill_id: i64) -> Result<Option<Bill>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM bills b WHERE b.id = ? AND b.user_id = ?",
            BILL_COLUMNS
        );

        let bill = conn
            .query_row(&sql, params![bill_id, user_id], row_to_bill)
            .optional()?;

        match bill {
            Some(mut bill) => {
                bill.items = load_items(&conn, bill.id)?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    /// List bills matching a filter, newest first
    pub fn list_bills(&self, user_id: i64, filter: &BillFilter) -> Result<Vec<Bill>> {
        self.select_bills(user_id, filter, "ORDER BY b.created_at DESC, b.id DESC")
    }

    /// List bills matching a filter in (date, id) order
    ///
    /// Stable ordering keeps vendor tie-breaks reproducible for analytics.
    pub(crate) fn list_bills_by_date(&self, user_id: i64, filter: &BillFilter) -> Result<Vec<Bill>> {
        self.select_bills(user_id, filter, "ORDER BY b.date ASC, b.id ASC")
    }

    fn select_bills(&self, user_id: i64, filter: &BillFilter, order: &str) -> Result<Vec<Bill>> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT {} FROM bills b {} {}",
            BILL_COLUMNS, built.where_clause, order
        );
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            built.params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let mut bills = stmt
            .query_map(param_refs.as_slice(), row_to_bill)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for bill in &mut bills {
            bill.items = load_items(&conn, bill.id)?;
        }

        debug!(user_id, count = bills.len(), "Loaded bills");
        Ok(bills)
    }

    /// Count, sum and average of the bills matching a filter
    pub fn bill_stats(&self, user_id: i64, filter: &BillFilter) -> Result<BillStats> {
        let conn = self.conn()?;
        let built = filter.build(user_id);

        let sql = format!(
            "SELECT b.total_amount, b.tax_amount FROM bills b {}",
            built.where_clause
        );
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            built.params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let amounts = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok((decimal_column(row, 0)?, decimal_column(row, 1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let total_bills = amounts.len() as i64;
        let total_amount: Decimal = amounts.iter().map(|(total, _)| *total).sum();
        let total_tax: Decimal = amounts.iter().map(|(_, tax)| *tax).sum();
        let average_amount = if total_bills > 0 {
            round_money(total_amount / Decimal::from(total_bills))
        } else {
            round_money(Decimal::ZERO)
        };

        Ok(BillStats {
            total_bills,
            total_amount: round_money(total_amount),
            total_tax: round_money(total_tax),
            average_amount,
        })
    }

    /// Set the verification status of a bill
    pub fn update_bill_status(&self, user_id: i64, bill_id: i64, status: BillStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE bills SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_id = ?",
            params![status.as_str(), bill_id, user_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Bill {}", bill_id)));
        }
        Ok(())
    }

    /// Delete a bill; items and corrections cascade
    pub fn delete_bill(&self, user_id: i64, bill_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM bills WHERE id = ? AND user_id = ?",
            params![bill_id, user_id],
        )?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Bill {}", bill_id)));
        }
        info!(bill_id, user_id, "Deleted bill");
        Ok(())
    }

    /// Record a correction and apply it to the bill
    ///
    /// The corrected value is parsed according to the field's type, the bill
    /// is marked `corrected`, and the correction is kept for history.
    pub fn correct_bill(
        &self,
        user_id: i64,
        bill_id: i64,
        field: CorrectableField,
        original_value: &str,
        corrected_value: &str,
    ) -> Result<BillCorrection> {
        if original_value.trim().is_empty() || corrected_value.trim().is_empty() {
            return Err(Error::Validation(
                "original_value and corrected_value are required".to_string(),
            ));
        }

        let stored_value = parse_corrected_value(field, corrected_value)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT id FROM bills WHERE id = ? AND user_id = ?",
                params![bill_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(Error::NotFound(format!("Bill {}", bill_id)));
        }

        // Column name comes from the closed CorrectableField set
        let sql = format!(
            "UPDATE bills SET {} = ?, status = 'corrected', updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            field.as_str()
        );
        tx.execute(&sql, params![stored_value, bill_id])?;

        tx.execute(
            r#"
            INSERT INTO bill_corrections (bill_id, field_name, original_value, corrected_value)
            VALUES (?, ?, ?, ?)
            "#,
            params![bill_id, field.as_str(), original_value, corrected_value],
        )?;
        let correction_id = tx.last_insert_rowid();

        let correction = tx.query_row(
            r#"
            SELECT id, bill_id, field_name, original_value, corrected_value, created_at
            FROM bill_corrections WHERE id = ?
            "#,
            params![correction_id],
            row_to_correction,
        )?;

        tx.commit()?;

        info!(bill_id, field = field.as_str(), "Applied bill correction");
        Ok(correction)
    }

    /// List corrections recorded for a bill, newest first
    pub fn list_corrections(&self, user_id: i64, bill_id: i64) -> Result<Vec<BillCorrection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT c.id, c.bill_id, c.field_name, c.original_value, c.corrected_value, c.created_at
            FROM bill_corrections c
            JOIN bills b ON b.id = c.bill_id
            WHERE c.bill_id = ? AND b.user_id = ?
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )?;

        let corrections = stmt
            .query_map(params![bill_id, user_id], row_to_correction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(corrections)
    }
}

/// Convert a corrected value into the column's storage form
fn parse_corrected_value(field: CorrectableField, value: &str) -> Result<String> {
    let value = value.trim();
    match field {
        CorrectableField::BillNumber | CorrectableField::VendorName | CorrectableField::Notes => {
            Ok(value.to_string())
        }
        CorrectableField::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.to_string())
            .map_err(|_| Error::Validation(format!("Invalid date '{}' (use YYYY-MM-DD)", value))),
        CorrectableField::TotalAmount | CorrectableField::TaxAmount => {
            let amount = Decimal::from_str(value)
                .map_err(|_| Error::Validation(format!("Invalid amount '{}'", value)))?;
            if amount < Decimal::ZERO {
                return Err(Error::Validation(format!(
                    "{} cannot be negative",
                    field.as_str()
                )));
            }
            Ok(money_text(amount))
        }
    }
}

fn load_items(conn: &DbConn, bill_id: i64) -> Result<Vec<BillItem>> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT id, bill_id, name, quantity, unit_price, total_price, category
        FROM bill_items
        WHERE bill_id = ?
        ORDER BY id
        "#,
    )?;

    let items = stmt
        .query_map(params![bill_id], |row| {
            Ok(BillItem {
                id: row.get(0)?,
                bill_id: row.get(1)?,
                name: row.get(2)?,
                quantity: decimal_column(row, 3)?,
                unit_price: decimal_column(row, 4)?,
                total_price: decimal_column(row, 5)?,
                category: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(items)
}

fn row_to_bill(row: &rusqlite::Row) -> rusqlite::Result<Bill> {
    let status: String = row.get(7)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Bill {
        id: row.get(0)?,
        user_id: row.get(1)?,
        bill_number: row.get(2)?,
        vendor_name: row.get(3)?,
        date: date_column(row, 4)?,
        total_amount: decimal_column(row, 5)?,
        tax_amount: decimal_column(row, 6)?,
        status: status.parse().unwrap_or_default(),
        notes: row.get(8)?,
        items: vec![],
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_correction(row: &rusqlite::Row) -> rusqlite::Result<BillCorrection> {
    let field: String = row.get(2)?;
    let created_at: String = row.get(5)?;
    Ok(BillCorrection {
        id: row.get(0)?,
        bill_id: row.get(1)?,
        field_name: field.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        original_value: row.get(3)?,
        corrected_value: row.get(4)?,
        created_at: parse_datetime(&created_at),
    })
}
