use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Base application role carried on a profile row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Fan,
    Auditioner,
    Member,
    Alumnae,
    Executive,
    Admin,
    SuperAdmin,
    /// Any role string this core does not know. Carries no privilege.
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Fan => "fan",
            Role::Auditioner => "auditioner",
            Role::Member => "member",
            Role::Alumnae => "alumnae",
            Role::Executive => "executive",
            Role::Admin => "admin",
            Role::SuperAdmin => "super-admin",
            Role::Unknown => "unknown",
        }
    }

    /// Lenient decoding of stored role strings (`super_admin` and
    /// `super-admin` are the same role).
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "fan" => Role::Fan,
            "auditioner" => Role::Auditioner,
            "member" | "user" => Role::Member,
            "alumnae" | "alumna" => Role::Alumnae,
            "executive" => Role::Executive,
            "admin" => Role::Admin,
            "super-admin" => Role::SuperAdmin,
            _ => Role::Unknown,
        }
    }
}

/// Executive-board positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExecPosition {
    StudentConductor,
    #[serde(rename = "soprano-1-section-leader")]
    Soprano1SectionLeader,
    #[serde(rename = "soprano-2-section-leader")]
    Soprano2SectionLeader,
    #[serde(rename = "alto-1-section-leader")]
    Alto1SectionLeader,
    #[serde(rename = "alto-2-section-leader")]
    Alto2SectionLeader,
    President,
    VicePresident,
    Secretary,
    Treasurer,
    TourManager,
    RoadManager,
    MerchandiseManager,
    PublicRelationsCoordinator,
    #[serde(rename = "public-relations-co-manager-1")]
    PublicRelationsCoManager1,
    #[serde(rename = "public-relations-co-manager-2")]
    PublicRelationsCoManager2,
    Historian,
    AlumnaeLiaison,
    AlumnaeCorrespondent,
    #[serde(rename = "co-librarian-1")]
    CoLibrarian1,
    #[serde(rename = "co-librarian-2")]
    CoLibrarian2,
    #[serde(rename = "co-wardrobe-mistress-1")]
    CoWardrobeMistress1,
    #[serde(rename = "co-wardrobe-mistress-2")]
    CoWardrobeMistress2,
    Chaplain,
    SetUpCrewManager,
    StageManager,
    ChiefOfStaff,
    DataAnalyst,
}

impl ExecPosition {
    pub const ALL: [ExecPosition; 27] = [
        ExecPosition::StudentConductor,
        ExecPosition::Soprano1SectionLeader,
        ExecPosition::Soprano2SectionLeader,
        ExecPosition::Alto1SectionLeader,
        ExecPosition::Alto2SectionLeader,
        ExecPosition::President,
        ExecPosition::VicePresident,
        ExecPosition::Secretary,
        ExecPosition::Treasurer,
        ExecPosition::TourManager,
        ExecPosition::RoadManager,
        ExecPosition::MerchandiseManager,
        ExecPosition::PublicRelationsCoordinator,
        ExecPosition::PublicRelationsCoManager1,
        ExecPosition::PublicRelationsCoManager2,
        ExecPosition::Historian,
        ExecPosition::AlumnaeLiaison,
        ExecPosition::AlumnaeCorrespondent,
        ExecPosition::CoLibrarian1,
        ExecPosition::CoLibrarian2,
        ExecPosition::CoWardrobeMistress1,
        ExecPosition::CoWardrobeMistress2,
        ExecPosition::Chaplain,
        ExecPosition::SetUpCrewManager,
        ExecPosition::StageManager,
        ExecPosition::ChiefOfStaff,
        ExecPosition::DataAnalyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecPosition::StudentConductor => "student-conductor",
            ExecPosition::Soprano1SectionLeader => "soprano-1-section-leader",
            ExecPosition::Soprano2SectionLeader => "soprano-2-section-leader",
            ExecPosition::Alto1SectionLeader => "alto-1-section-leader",
            ExecPosition::Alto2SectionLeader => "alto-2-section-leader",
            ExecPosition::President => "president",
            ExecPosition::VicePresident => "vice-president",
            ExecPosition::Secretary => "secretary",
            ExecPosition::Treasurer => "treasurer",
            ExecPosition::TourManager => "tour-manager",
            ExecPosition::RoadManager => "road-manager",
            ExecPosition::MerchandiseManager => "merchandise-manager",
            ExecPosition::PublicRelationsCoordinator => "public-relations-coordinator",
            ExecPosition::PublicRelationsCoManager1 => "public-relations-co-manager-1",
            ExecPosition::PublicRelationsCoManager2 => "public-relations-co-manager-2",
            ExecPosition::Historian => "historian",
            ExecPosition::AlumnaeLiaison => "alumnae-liaison",
            ExecPosition::AlumnaeCorrespondent => "alumnae-correspondent",
            ExecPosition::CoLibrarian1 => "co-librarian-1",
            ExecPosition::CoLibrarian2 => "co-librarian-2",
            ExecPosition::CoWardrobeMistress1 => "co-wardrobe-mistress-1",
            ExecPosition::CoWardrobeMistress2 => "co-wardrobe-mistress-2",
            ExecPosition::Chaplain => "chaplain",
            ExecPosition::SetUpCrewManager => "set-up-crew-manager",
            ExecPosition::StageManager => "stage-manager",
            ExecPosition::ChiefOfStaff => "chief-of-staff",
            ExecPosition::DataAnalyst => "data-analyst",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExecPosition::StudentConductor => "Student Conductor",
            ExecPosition::Soprano1SectionLeader => "Soprano 1 Section Leader",
            ExecPosition::Soprano2SectionLeader => "Soprano 2 Section Leader",
            ExecPosition::Alto1SectionLeader => "Alto 1 Section Leader",
            ExecPosition::Alto2SectionLeader => "Alto 2 Section Leader",
            ExecPosition::President => "President",
            ExecPosition::VicePresident => "Vice President",
            ExecPosition::Secretary => "Secretary",
            ExecPosition::Treasurer => "Treasurer",
            ExecPosition::TourManager => "Tour Manager",
            ExecPosition::RoadManager => "Road Manager",
            ExecPosition::MerchandiseManager => "Merchandise Manager",
            ExecPosition::PublicRelationsCoordinator => "Public Relations Coordinator",
            ExecPosition::PublicRelationsCoManager1 => "Public Relations Co-Manager 1",
            ExecPosition::PublicRelationsCoManager2 => "Public Relations Co-Manager 2",
            ExecPosition::Historian => "Historian",
            ExecPosition::AlumnaeLiaison => "Alumnae Liaison",
            ExecPosition::AlumnaeCorrespondent => "Alumnae Correspondent",
            ExecPosition::CoLibrarian1 => "Co-Librarian 1",
            ExecPosition::CoLibrarian2 => "Co-Librarian 2",
            ExecPosition::CoWardrobeMistress1 => "Co-Wardrobe Mistress 1",
            ExecPosition::CoWardrobeMistress2 => "Co-Wardrobe Mistress 2",
            ExecPosition::Chaplain => "Chaplain",
            ExecPosition::SetUpCrewManager => "Set-Up Crew Manager",
            ExecPosition::StageManager => "Stage Manager",
            ExecPosition::ChiefOfStaff => "Chief of Staff",
            ExecPosition::DataAnalyst => "Data Analyst",
        }
    }

    /// Unknown strings are treated as "no position".
    pub fn from_db(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

/// Read-only view of a `profiles` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_exec_board: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exec_board_position: Option<ExecPosition>,
}

impl Profile {
    pub fn new(user_id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            email: email.into(),
            role,
            is_exec_board: false,
            exec_board_position: None,
        }
    }

    pub fn with_position(mut self, position: ExecPosition) -> Self {
        self.is_exec_board = true;
        self.exec_board_position = Some(position);
        self
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_decode_leniently() {
        assert_eq!(Role::from_db("super_admin"), Role::SuperAdmin);
        assert_eq!(Role::from_db("Super-Admin"), Role::SuperAdmin);
        assert_eq!(Role::from_db("janitor"), Role::Unknown);
    }

    #[test]
    fn positions_round_trip_through_their_db_names() {
        for position in ExecPosition::ALL {
            assert_eq!(ExecPosition::from_db(position.as_str()), Some(position));
            let json = serde_json::to_value(position).unwrap();
            assert_eq!(json, serde_json::Value::String(position.as_str().to_string()));
        }
        assert_eq!(ExecPosition::from_db("drum-major"), None);
    }
}
