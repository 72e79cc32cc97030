use super::{CustomerReport, ReportUser};

/// Per-user session time at which the report generator clips its figures.
pub const REPORT_SESSION_CAP_MINUTES: u64 = 240;

fn is_capped(user: &ReportUser) -> bool {
    user.total_time_minutes == REPORT_SESSION_CAP_MINUTES && user.events > 0
}

/// Replace clipped user times with a share of the organization's session
/// total, then recompute `total_time_minutes`.
///
/// Users with uncapped times keep them. Whatever remains of the organization
/// total is split across capped users in proportion to their events, with a
/// floor of one minute each.
pub fn redistribute_capped_time(customer: &mut CustomerReport) {
    let capped: Vec<bool> = customer.users.iter().map(is_capped).collect();

    if capped.contains(&true) {
        let (capped_events, uncapped_minutes) = customer.users.iter().zip(&capped).fold(
            (0u64, 0u64),
            |(events, minutes), (user, &user_capped)| {
                if user_capped {
                    (events.saturating_add(user.events), minutes)
                } else {
                    (events, minutes.saturating_add(user.total_time_minutes))
                }
            },
        );
        let remaining = customer.avg_session_minutes.saturating_sub(uncapped_minutes);

        // capped users all have events, so capped_events > 0
        for (user, _) in customer.users.iter_mut().zip(&capped).filter(|(_, c)| **c) {
            let share =
                u128::from(remaining) * u128::from(user.events) / u128::from(capped_events);
            user.total_time_minutes = u64::try_from(share).unwrap_or(u64::MAX).max(1);
        }

        tracing::debug!(
            organization = %customer.name,
            capped_users = capped.iter().filter(|c| **c).count(),
            remaining_minutes = remaining,
            "Redistributed capped report time"
        );
    }

    customer.total_time_minutes = customer
        .users
        .iter()
        .fold(0u64, |acc, u| acc.saturating_add(u.total_time_minutes));
}
