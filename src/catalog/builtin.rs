//! Built-in function catalog and category metadata.

use crate::models::function::CategoryInfo;

/// (id, name, category, module, description)
pub(super) const FUNCTIONS: &[(&str, &str, &str, &str, &str)] = &[
    // Community hub
    ("announcements.view", "View Announcements", "community", "announcements", "Community announcements and updates"),
    ("calendar.view", "View Public Calendar", "community", "calendar", "Public events calendar"),
    ("directory.view", "View Member Directory", "community", "directory", "Member contact directory"),
    ("handbook.view", "View Handbook", "community", "handbook", "Official club handbook"),
    ("profile.update", "Update Own Profile", "community", "profile", "Edit personal profile information"),
    // Contracts
    ("contracts.view_own", "View Own Contracts", "contracts", "contracts", "Contracts assigned to the user"),
    ("contracts.sign", "Sign Contracts", "contracts", "contracts", "Digital signature of contracts"),
    ("contracts.create", "Create Contracts", "contracts", "contracts", "Create contracts from templates"),
    ("contracts.view_all", "View All Contracts", "contracts", "contracts", "Every contract in the system"),
    // Events
    ("events.view", "View Events", "events", "events", "Rehearsals, concerts and appearances"),
    ("events.manage", "Manage Events", "events", "events", "Create and edit events"),
    ("attendance.take", "Take Attendance", "events", "attendance", "Record attendance at events"),
    ("attendance.reports", "Attendance Reports", "events", "attendance", "Attendance history and exports"),
    // Tours
    ("tours.view", "View Tours", "tours", "tours", "Tour itineraries"),
    ("tours.manage", "Manage Tours", "tours", "tours", "Plan tours, rooming and logistics"),
    ("tours.budget", "Tour Budgets", "tours", "tours", "Tour budgets and expenses"),
    // Finances
    ("dues.view_own", "View Own Dues", "finances", "dues", "Personal dues balance"),
    ("dues.manage", "Manage Dues", "finances", "dues", "Record dues and payment plans"),
    ("budgets.manage", "Manage Budgets", "finances", "budgets", "Club budgets"),
    ("receipts.manage", "Manage Receipts", "finances", "receipts", "Receipt tracking and reimbursements"),
    ("stipends.manage", "Manage Stipends", "finances", "stipends", "Stipend payments"),
    // Wardrobe
    ("wardrobe.view", "View Wardrobe", "wardrobe", "wardrobe", "Wardrobe inventory"),
    ("wardrobe.manage", "Manage Wardrobe", "wardrobe", "wardrobe", "Fittings, checkouts and inventory"),
    // Library
    ("library.view", "View Music Library", "library", "library", "Sheet music and resources"),
    ("library.manage", "Manage Music Library", "library", "library", "Upload and organise sheet music"),
    ("library.assign", "Assign Music", "library", "library", "Assign music to sections"),
    // Communications
    ("communications.send", "Send Communications", "communications", "communications", "Email and SMS to members"),
    ("press_kits.manage", "Manage Press Kits", "communications", "press_kits", "Public relations assets"),
    ("media.manage", "Manage Media", "communications", "media", "Photo and video library"),
    ("merch.manage", "Manage Merchandise", "communications", "merch", "Merchandise store and inventory"),
    // Spiritual care
    ("prayer_requests.view", "View Prayer Requests", "spiritual-care", "spiritual_care", "Prayer requests from members"),
    ("spiritual_care.log", "Spiritual Care Log", "spiritual-care", "spiritual_care", "Pastoral care log entries"),
    ("devotions.manage", "Manage Devotions", "spiritual-care", "spiritual_care", "Devotional content"),
    // Executive board
    ("exec.dashboard", "Executive Dashboard", "executive", "executive", "Executive board dashboard"),
    ("exec.meeting_minutes", "Meeting Minutes", "executive", "executive", "Record and publish minutes"),
    ("exec.tasks", "Executive Tasks", "executive", "executive", "Board task tracking"),
    ("auditions.manage", "Manage Auditions", "executive", "auditions", "Audition scheduling and evaluation"),
    ("auditions.view", "View Auditions", "executive", "auditions", "Audition schedule"),
    ("alumnae.manage", "Manage Alumnae", "executive", "alumnae", "Alumnae relations and events"),
    // System administration
    ("system.users", "User Management", "system", "user_management", "Create and edit member accounts"),
    ("system.permissions", "Permission Management", "system", "permissions", "Groups, overrides and the position matrix"),
    ("system.settings", "System Settings", "system", "settings", "Application settings"),
    ("system.analytics", "Analytics", "system", "analytics", "Usage analytics and reports"),
];

pub(super) const CATEGORIES: &[CategoryInfo] = &[
    CategoryInfo { tag: "community", label: "Community Hub", color: "#0ea5e9", icon: "users" },
    CategoryInfo { tag: "contracts", label: "Contract Management", color: "#8b5cf6", icon: "file-signature" },
    CategoryInfo { tag: "events", label: "Events & Attendance", color: "#f59e0b", icon: "calendar" },
    CategoryInfo { tag: "tours", label: "Tours", color: "#10b981", icon: "bus" },
    CategoryInfo { tag: "finances", label: "Finances", color: "#22c55e", icon: "dollar-sign" },
    CategoryInfo { tag: "wardrobe", label: "Wardrobe", color: "#ec4899", icon: "shirt" },
    CategoryInfo { tag: "library", label: "Music Library", color: "#6366f1", icon: "music" },
    CategoryInfo { tag: "communications", label: "Communications", color: "#f97316", icon: "megaphone" },
    CategoryInfo { tag: "spiritual-care", label: "Spiritual Care", color: "#a855f7", icon: "heart" },
    CategoryInfo { tag: "executive", label: "Executive Board", color: "#ef4444", icon: "crown" },
    CategoryInfo { tag: "system", label: "System Administration", color: "#64748b", icon: "settings" },
];

pub(super) const FALLBACK_CATEGORY: CategoryInfo = CategoryInfo {
    tag: "other",
    label: "Other",
    color: "#94a3b8",
    icon: "circle",
};
