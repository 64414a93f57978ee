//! Monthly attendance overview for admins
//!
//! Days without a record count as absent here, the store itself keeps "not marked" distinct.

use attendance_protocol::{DayMark, EmployeeReport, Month, MonthlyReport, RecordKey, Records, Role, Status, UserProfile};

use std::collections::BTreeMap;

use crate::user_management::UserId;

pub fn monthly_report(month: Month, users: &BTreeMap<UserId, UserProfile>, records: &Records) -> MonthlyReport {
    let employees = users
        .iter()
        .filter(|(_, profile)| profile.role == Role::User)
        .map(|(username, profile)| {
            let days = month
                .dates()
                .map(|date| match records.get(&RecordKey::new(username.as_str(), date)) {
                    Some(Status::Present) => DayMark::Present,
                    Some(Status::Absent) | None => DayMark::Absent,
                })
                .collect::<Vec<_>>();
            let present = days.iter().filter(|mark| **mark == DayMark::Present).count() as u32;

            EmployeeReport {
                username: username.clone(),
                name: profile.name.clone(),
                absent: days.len() as u32 - present,
                present,
                days,
            }
        })
        .collect();

    MonthlyReport {
        month,
        days_in_month: month.days_in_month(),
        employees,
    }
}
