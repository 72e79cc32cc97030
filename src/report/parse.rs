use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};

use super::{CustomerReport, DailyActivity, ReportError, ReportUser, redistribute_capped_time};

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n###\s+").unwrap());

static BOLD_COUNT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([0-9,]+)\*\*").unwrap());

static SESSION_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~(\d+)\s+minutes").unwrap());

static FLOW_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Started|Completed|Failed):\s*([0-9,]+)").unwrap());

static SUCCESS_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Success Rate:\s*([0-9.]+)%").unwrap());

static DAILY_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-\s*(\d{4}-\d{2}-\d{2}):\s*([0-9,]+)\s+events").unwrap());

/// `- <email>: <n> events, <m>m time, <f> flows`
static USER_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\s*([^:]+):\s*([0-9,]+)\s+events?,\s*(\d+)m\s+time,\s*([0-9,]+)\s+flows?")
        .unwrap()
});

/// Which list the following `-` lines belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Summary,
    Daily,
    Users,
}

/// Parse every `###` section after the report header.
pub(super) fn parse_sections(contents: &str) -> Result<Vec<CustomerReport>, ReportError> {
    let mut customers = Vec::new();

    for section in SECTION_HEADER.split(contents).skip(1) {
        let mut customer = parse_section(section)?;
        redistribute_capped_time(&mut customer);

        if customer.users.is_empty() {
            tracing::debug!(
                organization = %customer.name,
                "Skipping report section without users"
            );
            continue;
        }
        customers.push(customer);
    }

    Ok(customers)
}

fn parse_section(section: &str) -> Result<CustomerReport, ReportError> {
    let mut lines = section.trim().lines();
    let name = lines.next().unwrap_or_default().trim();
    let mut customer = CustomerReport::new(name);
    let mut block = Block::Summary;

    for line in lines.map(str::trim) {
        // A horizontal rule closes the section, even inside a list.
        if line.starts_with("---") {
            break;
        }

        if line.contains("Active Users:") {
            if let Some(caps) = BOLD_COUNT.captures(line) {
                customer.active_users = parse_count(&caps[1])?;
            }
        } else if line.contains("Total Events:") {
            if let Some(caps) = BOLD_COUNT.captures(line) {
                customer.total_events = parse_count(&caps[1])?;
            }
        } else if line.contains("Avg Session Time:") {
            if let Some(caps) = SESSION_MINUTES.captures(line) {
                customer.avg_session_minutes = parse_count(&caps[1])?;
            }
        } else if line.contains("- Started:")
            || line.contains("- Completed:")
            || line.contains("- Failed:")
        {
            if let Some(caps) = FLOW_COUNT.captures(line) {
                let count = parse_count(&caps[2])?;
                match &caps[1] {
                    "Started" => customer.flows.started = count,
                    "Completed" => customer.flows.completed = count,
                    _ => customer.flows.failed = count,
                }
            }
        } else if line.contains("- Success Rate:") {
            if let Some(caps) = SUCCESS_RATE.captures(line) {
                let rate = caps[1]
                    .parse::<f64>()
                    .map_err(|_| ReportError::InvalidNumber(caps[1].to_string()))?;
                customer.success_rate = Some(rate);
            }
        } else if line.contains("**Daily Activity:**") {
            block = Block::Daily;
        } else if block == Block::Daily && DAILY_ENTRY.is_match(line) {
            if let Some(caps) = DAILY_ENTRY.captures(line) {
                customer.daily_activity.push(daily_entry(&caps)?);
            }
        } else if line.contains("**Users:**") {
            block = Block::Users;
        } else if block == Block::Users && line.starts_with('-') {
            if let Some(caps) = USER_ENTRY.captures(line) {
                customer.users.push(user_entry(&caps)?);
            }
        }
    }

    Ok(customer)
}

fn daily_entry(caps: &Captures<'_>) -> Result<DailyActivity, ReportError> {
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
        .map_err(|_| ReportError::InvalidDate(caps[1].to_string()))?;
    Ok(DailyActivity {
        date,
        events: parse_count(&caps[2])?,
    })
}

fn user_entry(caps: &Captures<'_>) -> Result<ReportUser, ReportError> {
    Ok(ReportUser {
        email: caps[1].trim().to_string(),
        events: parse_count(&caps[2])?,
        total_time_minutes: parse_count(&caps[3])?,
        flows: parse_count(&caps[4])?,
    })
}

/// Parse a count that may use `,` as a thousands separator.
fn parse_count(raw: &str) -> Result<u64, ReportError> {
    raw.replace(',', "")
        .parse()
        .map_err(|_| ReportError::InvalidNumber(raw.to_string()))
}
