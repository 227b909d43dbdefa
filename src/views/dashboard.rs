use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

use super::theme::Theme;
use crate::auth::{Permission, Role, SessionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatCard {
    pub title: &'static str,
    pub value: &'static str,
    pub change: &'static str,
    pub trend: Trend,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Grade,
    Attendance,
    Assignment,
}

#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub subject: &'static str,
    pub description: &'static str,
    pub time: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradeRow {
    pub subject: &'static str,
    pub grade: &'static str,
    pub coefficient: &'static str,
    pub date: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Present,
    Late,
    Absent,
}

impl DayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DayStatus::Present => "Présent",
            DayStatus::Late => "Retard",
            DayStatus::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceDay {
    pub day: &'static str,
    pub status: DayStatus,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSummary {
    pub present_rate: u8,
    pub absent_rate: u8,
    pub late_rate: u8,
    pub week: Vec<AttendanceDay>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePanel {
    pub display_name: String,
    pub initials: String,
    pub role: Role,
    pub school_id: String,
    pub login_time: DateTime<Utc>,
    pub theme: Theme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardView {
    Dashboard,
    Grades,
    Attendance,
    Profile,
}

impl DashboardView {
    pub fn label(&self) -> &'static str {
        match self {
            DashboardView::Dashboard => "Tableau de Bord",
            DashboardView::Grades => "Notes",
            DashboardView::Attendance => "Présences",
            DashboardView::Profile => "Profil",
        }
    }

    pub fn required_permission(&self) -> Permission {
        match self {
            DashboardView::Dashboard => Permission::ViewDashboard,
            DashboardView::Grades => Permission::ViewGrades,
            DashboardView::Attendance => Permission::ViewAttendance,
            DashboardView::Profile => Permission::ViewOwnProfile,
        }
    }
}

impl FromStr for DashboardView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(DashboardView::Dashboard),
            "grades" => Ok(DashboardView::Grades),
            "attendance" => Ok(DashboardView::Attendance),
            "profile" => Ok(DashboardView::Profile),
            _ => Err(format!("Unknown dashboard view: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum ViewContent {
    Dashboard {
        stats: Vec<StatCard>,
        activities: Vec<Activity>,
    },
    Grades {
        grades: Vec<GradeRow>,
    },
    Attendance(AttendanceSummary),
    Profile(ProfilePanel),
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPage {
    pub title: &'static str,
    pub user: SessionContext,
    pub content: ViewContent,
    pub can_view_class_statistics: bool,
    pub can_view_school_statistics: bool,
    pub can_manage_directors: bool,
}

const fn stat(
    title: &'static str,
    value: &'static str,
    change: &'static str,
    trend: Trend,
    description: &'static str,
) -> StatCard {
    StatCard {
        title,
        value,
        change,
        trend,
        description,
    }
}

pub fn stats_for(role: Role) -> Vec<StatCard> {
    match role {
        Role::Teacher => vec![
            stat("Étudiants", "127", "+5", Trend::Up, "Total inscrit"),
            stat("Cours", "24", "0", Trend::Neutral, "Cette semaine"),
            stat("Devoirs", "18", "+6", Trend::Up, "À corriger"),
        ],
        Role::Director => vec![
            stat("Étudiants", "1,247", "+47", Trend::Up, "Total inscrit"),
            stat("Enseignants", "89", "+2", Trend::Up, "Actifs"),
            stat("Taux Réussite", "87%", "+3%", Trend::Up, "Ce trimestre"),
        ],
        Role::Student | Role::Admin => vec![
            stat("Notes Récentes", "15.2", "+2.1", Trend::Up, "Moyenne générale"),
            stat("Présences", "94%", "+1.2%", Trend::Up, "Ce mois"),
            stat("Devoirs", "12", "-3", Trend::Down, "En attente"),
        ],
    }
}

pub fn recent_activities() -> Vec<Activity> {
    vec![
        Activity {
            kind: ActivityKind::Grade,
            subject: "Mathématiques",
            description: "Note ajoutée: 16/20",
            time: "Il y a 2 heures",
        },
        Activity {
            kind: ActivityKind::Attendance,
            subject: "Présence",
            description: "Présent en cours de Français",
            time: "Il y a 3 heures",
        },
        Activity {
            kind: ActivityKind::Assignment,
            subject: "Histoire",
            description: "Devoir à rendre demain",
            time: "Il y a 1 jour",
        },
        Activity {
            kind: ActivityKind::Grade,
            subject: "Sciences",
            description: "Note ajoutée: 14/20",
            time: "Il y a 2 jours",
        },
    ]
}

pub fn recent_grades() -> Vec<GradeRow> {
    [
        ("Mathématiques", "16/20", "3", "15/11/2024"),
        ("Français", "14/20", "2", "12/11/2024"),
        ("Histoire", "15/20", "2", "10/11/2024"),
        ("Sciences", "17/20", "3", "08/11/2024"),
    ]
    .into_iter()
    .map(|(subject, grade, coefficient, date)| GradeRow {
        subject,
        grade,
        coefficient,
        date,
    })
    .collect()
}

pub fn attendance_summary() -> AttendanceSummary {
    let week = [
        ("Lundi", DayStatus::Present),
        ("Mardi", DayStatus::Present),
        ("Mercredi", DayStatus::Late),
        ("Jeudi", DayStatus::Present),
        ("Vendredi", DayStatus::Absent),
    ]
    .into_iter()
    .map(|(day, status)| AttendanceDay {
        day,
        status,
        label: status.label(),
    })
    .collect();

    AttendanceSummary {
        present_rate: 89,
        absent_rate: 8,
        late_rate: 3,
        week,
    }
}

/// First letter of each word of the display name.
pub fn initials(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

pub fn build_page(session: &SessionContext, view: DashboardView, theme: Theme) -> DashboardPage {
    let content = match view {
        DashboardView::Dashboard => ViewContent::Dashboard {
            stats: stats_for(session.role),
            activities: recent_activities(),
        },
        DashboardView::Grades => ViewContent::Grades {
            grades: recent_grades(),
        },
        DashboardView::Attendance => ViewContent::Attendance(attendance_summary()),
        DashboardView::Profile => ViewContent::Profile(ProfilePanel {
            display_name: session.display_name.clone(),
            initials: initials(&session.display_name),
            role: session.role,
            school_id: session.school_id.clone(),
            login_time: session.login_time,
            theme,
        }),
    };

    DashboardPage {
        title: view.label(),
        user: session.clone(),
        content,
        can_view_class_statistics: session.has_permission(Permission::ViewClassStatistics),
        can_view_school_statistics: session.has_permission(Permission::ViewSchoolStatistics),
        can_manage_directors: session.has_permission(Permission::ManageDirectors),
    }
}
