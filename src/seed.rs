use rand::seq::SliceRandom;
use rand::Rng;
use time::{Date, Duration, OffsetDateTime, Time, Weekday};
use tracing::{debug, info};
use uuid::Uuid;

use crate::attendance::repo::{date_key, AttendanceRecord, BreakRecord, RecordStatus};
use crate::auth::repo::{Role, User};
use crate::auth::services::hash_password;
use crate::directory::repo::{
    store_list, ACTIVITIES_KEY, BREAK_TYPES_KEY, DEFAULT_ACTIVITIES, DEFAULT_BREAK_TYPES,
};
use crate::requests::repo::{LeaveRequest, RequestStatus, TimeChangeKind, TimeChangeRequest};
use crate::state::AppState;

pub const SUPERADMIN_EMAIL: &str = "superadmin@example.com";
const SUPERADMIN_PASSWORD: &str = "admin123";

/// First-boot bootstrap. A single existing user short-circuits everything,
/// so restarts never duplicate the roster.
pub async fn seed_if_empty(state: &AppState) -> anyhow::Result<()> {
    if !User::list_all(state.store.as_ref()).await?.is_empty() {
        debug!("store already seeded, skipping bootstrap");
        return Ok(());
    }

    let superadmin = User {
        id: Uuid::new_v4(),
        email: SUPERADMIN_EMAIL.into(),
        password_hash: hash_password(SUPERADMIN_PASSWORD)?,
        role: Role::Superadmin,
        name: "Super Admin".into(),
        team: None,
        assigned_to: None,
    };
    superadmin.save(state.store.as_ref()).await?;

    let break_types: Vec<String> = DEFAULT_BREAK_TYPES.iter().map(|s| s.to_string()).collect();
    let activities: Vec<String> = DEFAULT_ACTIVITIES.iter().map(|s| s.to_string()).collect();
    store_list(state.store.as_ref(), BREAK_TYPES_KEY, &break_types).await?;
    store_list(state.store.as_ref(), ACTIVITIES_KEY, &activities).await?;
    info!(email = SUPERADMIN_EMAIL, "superadmin and default settings created");

    if state.config.seed_demo {
        seed_demo_data(state).await?;
    }

    Ok(())
}

const DEMO_ADMINS: &[(&str, &str, &str)] = &[
    ("John Admin", "admin1@example.com", "Sales"),
    ("Sarah Admin", "admin2@example.com", "Support"),
    ("Michael Chen", "admin3@example.com", "Technical"),
    ("Emma Wilson", "admin4@example.com", "Sales"),
];

// (name, email, admin index, team)
const DEMO_AGENTS: &[(&str, &str, usize, &str)] = &[
    ("Alice Johnson", "alice@example.com", 0, "Sales"),
    ("Bob Smith", "bob@example.com", 0, "Sales"),
    ("Carol Davis", "carol@example.com", 3, "Sales"),
    ("David Miller", "david@example.com", 3, "Sales"),
    ("Charlie Brown", "charlie@example.com", 1, "Support"),
    ("Diana Ross", "diana@example.com", 1, "Support"),
    ("Eve Williams", "eve@example.com", 1, "Support"),
    ("Frank Garcia", "frank@example.com", 1, "Support"),
    ("Grace Lee", "grace@example.com", 2, "Technical"),
    ("Henry Martinez", "henry@example.com", 2, "Technical"),
    ("Ivy Anderson", "ivy@example.com", 2, "Technical"),
    ("Jack Taylor", "jack@example.com", 2, "Technical"),
    ("Kelly White", "kelly@example.com", 2, "Technical"),
    ("Liam Harris", "liam@example.com", 2, "Technical"),
    ("Mia Clark", "mia@example.com", 2, "Technical"),
];

const DEMO_DEVICES: &[(&str, &str, &str)] = &[
    ("Windows PC", "Desktop", "Windows 11"),
    ("MacBook Pro", "Laptop", "macOS"),
    ("iPhone 14", "Mobile", "iOS 17"),
    ("Samsung Galaxy", "Mobile", "Android 14"),
    ("iPad Pro", "Tablet", "iPadOS 17"),
    ("Dell Laptop", "Laptop", "Windows 11"),
    ("ThinkPad", "Laptop", "Windows 10"),
    ("iMac", "Desktop", "macOS"),
];

const DEMO_ACTIVITIES: &[&str] = &[
    "Available",
    "On Call",
    "Email Support",
    "Chat Support",
    "Documentation",
];

fn at(date: Date, hour: u8, minute: u8) -> anyhow::Result<OffsetDateTime> {
    Ok(date.with_time(Time::from_hms(hour, minute, 0)?).assume_utc())
}

/// Demo roster plus roughly two months of weekday attendance history.
async fn seed_demo_data(state: &AppState) -> anyhow::Result<()> {
    let mut rng = rand::thread_rng();
    let password_hash = hash_password("admin123")?;
    let now = OffsetDateTime::now_utc();

    let mut admin_ids = Vec::with_capacity(DEMO_ADMINS.len());
    for (name, email, team) in DEMO_ADMINS {
        let admin = User {
            id: Uuid::new_v4(),
            email: (*email).into(),
            password_hash: password_hash.clone(),
            role: Role::Admin,
            name: (*name).into(),
            team: Some((*team).into()),
            assigned_to: None,
        };
        admin.save(state.store.as_ref()).await?;
        admin_ids.push(admin.id);
    }

    let mut agent_ids = Vec::with_capacity(DEMO_AGENTS.len());
    for (name, email, admin_idx, team) in DEMO_AGENTS {
        let agent = User {
            id: Uuid::new_v4(),
            email: (*email).into(),
            password_hash: password_hash.clone(),
            role: Role::Agent,
            name: (*name).into(),
            team: Some((*team).into()),
            assigned_to: Some(admin_ids[*admin_idx]),
        };
        agent.save(state.store.as_ref()).await?;
        agent_ids.push(agent.id);
    }

    for day_offset in 0..60 {
        let date = (now - Duration::days(day_offset)).date();
        if matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday) {
            continue;
        }

        for &agent_id in &agent_ids {
            // roughly 85% attendance
            if rng.gen::<f64>() > 0.85 {
                continue;
            }

            let (device_name, device_type, device_os) =
                *DEMO_DEVICES.choose(&mut rng).unwrap_or(&DEMO_DEVICES[0]);
            let activity = DEMO_ACTIVITIES.choose(&mut rng).unwrap_or(&"Available");
            let login = at(date, rng.gen_range(8..10), rng.gen_range(0..60))?;
            let logout = at(date, rng.gen_range(17..19), rng.gen_range(0..60))?;

            let record = AttendanceRecord {
                id: Uuid::new_v4(),
                user_id: agent_id,
                date: date_key(date),
                login_time: Some(login),
                logout_time: Some(logout),
                activity: (*activity).into(),
                status: RecordStatus::Completed,
                device_name: device_name.into(),
                device_type: device_type.into(),
                device_os: device_os.into(),
                ip_address: format!(
                    "192.168.{}.{}",
                    rng.gen_range(0..255),
                    rng.gen_range(0..255)
                ),
            };
            record.save(state.store.as_ref()).await?;

            for _ in 0..rng.gen_range(2..=4) {
                let start = at(date, rng.gen_range(10..16), rng.gen_range(0..60))?;
                let end = start + Duration::minutes(rng.gen_range(15..60));
                let break_record = BreakRecord {
                    id: Uuid::new_v4(),
                    user_id: agent_id,
                    break_type: DEFAULT_BREAK_TYPES
                        .choose(&mut rng)
                        .unwrap_or(&"Coffee Break")
                        .to_string(),
                    activity: (*activity).into(),
                    start_time: start,
                    end_time: Some(end),
                    status: RecordStatus::Completed,
                    resume_activity: Some((*activity).into()),
                };
                break_record.save(state.store.as_ref()).await?;
            }
        }
    }

    let leave1_start = (now + Duration::days(7)).date();
    LeaveRequest {
        id: Uuid::new_v4(),
        user_id: agent_ids[0],
        user_name: "Alice Johnson".into(),
        start_date: date_key(leave1_start),
        end_date: date_key(leave1_start + Duration::days(2)),
        reason: "Family vacation".into(),
        status: RequestStatus::Pending,
        assigned_to: Some(admin_ids[0]),
        created_at: now,
        approved_by: None,
        approved_at: None,
    }
    .save(state.store.as_ref())
    .await?;

    let leave2_start = (now + Duration::days(14)).date();
    LeaveRequest {
        id: Uuid::new_v4(),
        user_id: agent_ids[4],
        user_name: "Charlie Brown".into(),
        start_date: date_key(leave2_start),
        end_date: date_key(leave2_start + Duration::days(1)),
        reason: "Medical appointment".into(),
        status: RequestStatus::Pending,
        assigned_to: Some(admin_ids[1]),
        created_at: now,
        approved_by: None,
        approved_at: None,
    }
    .save(state.store.as_ref())
    .await?;

    let yesterday = (now - Duration::days(1)).date();
    TimeChangeRequest {
        id: Uuid::new_v4(),
        user_id: agent_ids[1],
        user_name: "Bob Smith".into(),
        kind: TimeChangeKind::Login,
        date: date_key(yesterday),
        original_time: at(yesterday, 9, 15)?,
        requested_time: at(yesterday, 9, 0)?,
        reason: "Traffic delay, arrived late but need to log correct time".into(),
        status: RequestStatus::Pending,
        assigned_to: Some(admin_ids[0]),
        created_at: now,
        approved_by: None,
        approved_at: None,
    }
    .save(state.store.as_ref())
    .await?;

    info!(
        admins = DEMO_ADMINS.len(),
        agents = DEMO_AGENTS.len(),
        "demo data created"
    );
    Ok(())
}
