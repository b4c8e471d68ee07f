//! Sample dataset fixture: a `departments` table and an `employees` table.

use crate::error::{BqError, BqResult};
use crate::models::query::ScalarType;
use crate::models::schema::{FieldSpec, TableSpec};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub const DEPARTMENTS_TABLE: &str = "departments";
pub const EMPLOYEES_TABLE: &str = "employees";
pub const DEPARTMENT_COUNT: usize = 10;
pub const EMPLOYEE_COUNT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub dept_id: String,
    pub dept_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub emp_id: String,
    pub emp_name: String,
    /// Always one of the generated department ids
    pub dept_id: String,
}

pub fn departments_table() -> TableSpec {
    TableSpec::new(
        DEPARTMENTS_TABLE,
        vec![
            FieldSpec::required("dept_id", ScalarType::String),
            FieldSpec::required("dept_name", ScalarType::String),
        ],
    )
}

pub fn employees_table() -> TableSpec {
    TableSpec::new(
        EMPLOYEES_TABLE,
        vec![
            FieldSpec::required("emp_id", ScalarType::String),
            FieldSpec::required("emp_name", ScalarType::String),
            FieldSpec::required("dept_id", ScalarType::String),
        ],
    )
}

/// Departments `dept_1..dept_10`.
pub fn generate_departments() -> Vec<Department> {
    (1..=DEPARTMENT_COUNT)
        .map(|i| Department {
            dept_id: format!("dept_{}", i),
            dept_name: format!("Department_{}", i),
        })
        .collect()
}

/// Employees assigned to a random department from `departments`.
pub fn generate_employees<R: Rng + ?Sized>(
    departments: &[Department],
    rng: &mut R,
) -> BqResult<Vec<Employee>> {
    (1..=EMPLOYEE_COUNT)
        .map(|i| {
            let department = departments.choose(rng).ok_or_else(|| {
                BqError::internal("Cannot assign employees without departments")
            })?;
            let uuid = uuid::Builder::from_random_bytes(rng.r#gen()).into_uuid();
            let hex = uuid.simple().to_string();
            Ok(Employee {
                emp_id: format!("emp_{}", &hex[..8]),
                emp_name: format!("Employee_{}", i),
                dept_id: department.dept_id.clone(),
            })
        })
        .collect()
}

/// A complete set of fixture rows.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub departments: Vec<Department>,
    pub employees: Vec<Employee>,
}

impl SampleData {
    pub fn generate() -> BqResult<Self> {
        Self::generate_with(&mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> BqResult<Self> {
        let departments = generate_departments();
        let employees = generate_employees(&departments, rng)?;
        Ok(Self {
            departments,
            employees,
        })
    }

    /// Status line reported after the fixture has been inserted.
    pub fn summary(&self) -> String {
        format!(
            "Sample data inserted ({} departments, {} employees)",
            self.departments.len(),
            self.employees.len()
        )
    }
}
