use crate::db::models::User;

/// Display label plus accessor for each field a participant must fill in
/// before self-registering.
const REQUIRED_FIELDS: &[(&str, fn(&User) -> Option<&str>)] = &[
    ("Nama Lengkap", |user| Some(user.nama.as_str())),
    ("Email", |user| user.email.as_deref()),
    ("Alamat", |user| user.alamat.as_deref()),
    ("Nomor HP", |user| user.no_hp.as_deref()),
    ("Program Studi", |user| user.prodi.as_deref()),
    ("Fakultas", |user| user.fakultas.as_deref()),
    ("Universitas", |user| user.universitas.as_deref()),
    ("NPM", |user| user.npm.as_deref()),
];

pub(crate) fn missing_fields(user: &User) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .filter(|(_, value)| value(user).map(str::trim).map_or(true, str::is_empty))
        .map(|(label, _)| *label)
        .collect()
}

pub(crate) fn is_complete(user: &User) -> bool {
    missing_fields(user).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use time::macros::datetime;

    fn peserta() -> User {
        User {
            id: "p1".to_string(),
            username: "siti".to_string(),
            hashed_password: String::new(),
            role: UserRole::Peserta,
            nama: "Siti Aminah".to_string(),
            email: Some("siti@student.unsika.ac.id".to_string()),
            alamat: Some("Karawang".to_string()),
            no_hp: Some("0812000000".to_string()),
            prodi: Some("Informatika".to_string()),
            fakultas: Some("Ilmu Komputer".to_string()),
            universitas: Some("UNSIKA".to_string()),
            npm: Some("2010631170001".to_string()),
            is_active: true,
            created_at: datetime!(2025-01-01 00:00),
            updated_at: datetime!(2025-01-01 00:00),
        }
    }

    #[test]
    fn complete_profile_has_no_missing_fields() {
        assert!(is_complete(&peserta()));
    }

    #[test]
    fn blank_and_absent_fields_are_reported_by_label() {
        let mut user = peserta();
        user.no_hp = None;
        user.npm = Some("   ".to_string());

        assert_eq!(missing_fields(&user), vec!["Nomor HP", "NPM"]);
    }
}
