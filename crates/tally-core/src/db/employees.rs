//! Employee operations

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Employee, NewEmployee};

const EMPLOYEE_COLUMNS: &str =
    "id, name, role, business_id, monthly_salary, hired_at, notes, created_at";

fn row_to_employee(row: &rusqlite::Row<'_>) -> rusqlite::Result<Employee> {
    let hired_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(7)?;
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        business_id: row.get(3)?,
        monthly_salary: row.get(4)?,
        hired_at: hired_at.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        notes: row.get(6)?,
        created_at: parse_datetime(&created_at),
    })
}

pub(crate) fn insert_employee_row(
    conn: &Connection,
    id: Option<i64>,
    employee: &NewEmployee,
    created_at: Option<&str>,
) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO employees (id, name, role, business_id, monthly_salary, hired_at, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, COALESCE(?, CURRENT_TIMESTAMP))
        "#,
        params![
            id,
            employee.name.trim(),
            employee.role,
            employee.business_id,
            employee.monthly_salary,
            employee.hired_at.map(|d| d.format("%Y-%m-%d").to_string()),
            employee.notes,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Create an employee
    pub fn create_employee(&self, employee: &NewEmployee) -> Result<i64> {
        employee.validate()?;
        let conn = self.conn()?;
        insert_employee_row(&conn, None, employee, None)
    }

    /// Get an employee by ID
    pub fn get_employee(&self, id: i64) -> Result<Option<Employee>> {
        let conn = self.conn()?;
        let employee = conn
            .query_row(
                &format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS),
                params![id],
                row_to_employee,
            )
            .optional()?;
        Ok(employee)
    }

    /// List employees by name
    pub fn list_employees(&self) -> Result<Vec<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM employees ORDER BY name COLLATE NOCASE, id",
            EMPLOYEE_COLUMNS
        ))?;

        let employees = stmt
            .query_map([], row_to_employee)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(employees)
    }

    /// Replace an employee's fields; false if the employee doesn't exist
    pub fn update_employee(&self, id: i64, employee: &NewEmployee) -> Result<bool> {
        employee.validate()?;
        let conn = self.conn()?;
        let updated = conn.execute(
            r#"
            UPDATE employees
            SET name = ?, role = ?, business_id = ?, monthly_salary = ?, hired_at = ?, notes = ?
            WHERE id = ?
            "#,
            params![
                employee.name.trim(),
                employee.role,
                employee.business_id,
                employee.monthly_salary,
                employee.hired_at.map(|d| d.format("%Y-%m-%d").to_string()),
                employee.notes,
                id,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Delete an employee; false if the employee doesn't exist
    pub fn delete_employee(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM employees WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
