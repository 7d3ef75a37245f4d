// Project status constants
pub const PROJECT_STATUS_ACTIVE: &str = "ACTIVE";
pub const PROJECT_STATUS_ON_HOLD: &str = "ON_HOLD";
pub const PROJECT_STATUS_COMPLETED: &str = "COMPLETED";
pub const PROJECT_STATUS_ARCHIVED: &str = "ARCHIVED";

pub const PROJECT_STATUSES: [&str; 4] = [
    PROJECT_STATUS_ACTIVE,
    PROJECT_STATUS_ON_HOLD,
    PROJECT_STATUS_COMPLETED,
    PROJECT_STATUS_ARCHIVED,
];

// Task status constants
pub const TASK_STATUS_TODO: &str = "TODO";
pub const TASK_STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const TASK_STATUS_REVIEW: &str = "REVIEW";
pub const TASK_STATUS_DONE: &str = "DONE";

pub const TASK_STATUSES: [&str; 4] = [
    TASK_STATUS_TODO,
    TASK_STATUS_IN_PROGRESS,
    TASK_STATUS_REVIEW,
    TASK_STATUS_DONE,
];

// Priority constants (shared by projects and tasks)
pub const PRIORITY_LOW: &str = "LOW";
pub const PRIORITY_MEDIUM: &str = "MEDIUM";
pub const PRIORITY_HIGH: &str = "HIGH";
pub const PRIORITY_URGENT: &str = "URGENT";

pub const PRIORITIES: [&str; 4] = [PRIORITY_LOW, PRIORITY_MEDIUM, PRIORITY_HIGH, PRIORITY_URGENT];

// Project member roles; the owner is implicit and never stored here
pub const MEMBER_ROLE_MEMBER: &str = "MEMBER";
pub const MEMBER_ROLE_ADMIN: &str = "ADMIN";

pub const TITLE_MAX_LEN: usize = 255;

/// Normalizes a user-supplied enum-ish value against an allowed set,
/// returning the canonical upper-case constant.
pub fn canonical_value(value: &str, allowed: &[&'static str]) -> Option<&'static str> {
    let upper = value.trim().to_ascii_uppercase();
    allowed.iter().copied().find(|v| *v == upper)
}
