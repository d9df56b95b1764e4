//! Plain-text tables for the terminal

use std::fmt::Write;
use woresk_core::types::{ActivityEvent, Processor, SuperAdmin, UserRole, activity_label};
use woresk_core::utils::display_timestamp;

/// Placeholder for a missing value
pub const EMPTY_CELL: &str = "—";

/// Left-aligned table with a header rule
#[must_use]
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, headers.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

/// Users panel
#[must_use]
pub fn users(rows: &[UserRole]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.username.clone(),
                u.ip_address.clone(),
                u.role_name.to_string(),
                activity_label(u.is_active).to_string(),
            ]
        })
        .collect();
    table(&["ID", "USERNAME", "IP ADDRESS", "ROLE", "STATUS"], &body)
}

/// Super-admins panel
#[must_use]
pub fn super_admins(rows: &[SuperAdmin]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.username.clone(),
                non_empty(&a.ip_address),
                a.status().to_string(),
            ]
        })
        .collect();
    table(&["ID", "USERNAME", "IP ADDRESS", "STATUS"], &body)
}

/// Processors panel
#[must_use]
pub fn processors(rows: &[Processor]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.name.clone(),
                p.kind.to_string(),
                p.verified_label().to_string(),
                p.status.to_string(),
                non_empty(&display_timestamp(&p.created_at)),
            ]
        })
        .collect();
    table(&["ID", "NAME", "TYPE", "VERIFIED", "STATUS", "CREATED"], &body)
}

/// Activity log
#[must_use]
pub fn alerts(rows: &[ActivityEvent]) -> String {
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.label(),
                e.severity().to_string(),
                e.username.as_deref().map_or_else(|| EMPTY_CELL.to_string(), non_empty),
                e.ip_addr.clone(),
                display_timestamp(&e.timestamp),
            ]
        })
        .collect();
    table(&["ID", "EVENT", "LEVEL", "USER", "IP", "TIME"], &body)
}

fn non_empty(value: &str) -> String {
    if value.is_empty() {
        EMPTY_CELL.to_string()
    } else {
        value.to_string()
    }
}
