use time::PrimitiveDateTime;

const FALLBACK_PREFIX: &str = "JDW";
const MAX_PREFIX_LEN: usize = 4;
const SEQUENCE_WIDTH: usize = 3;
const MAX_SEQUENCE: u32 = 999;

/// Up to two leading alphanumerics of each word, uppercased, capped at four.
pub(crate) fn name_prefix(nama_jadwal: &str) -> String {
    let prefix: String = nama_jadwal
        .split_whitespace()
        .flat_map(|word| {
            word.chars().filter(|ch| ch.is_ascii_alphanumeric()).take(2).collect::<Vec<_>>()
        })
        .map(|ch| ch.to_ascii_uppercase())
        .take(MAX_PREFIX_LEN)
        .collect();

    if prefix.is_empty() {
        FALLBACK_PREFIX.to_string()
    } else {
        prefix
    }
}

/// `<name prefix><two-digit year>`; the sequence is appended by [`next_kode`].
pub(crate) fn kode_stem(nama_jadwal: &str, tanggal_mulai: PrimitiveDateTime) -> String {
    let year = tanggal_mulai.year().rem_euclid(100);
    format!("{}{year:02}", name_prefix(nama_jadwal))
}

/// `None` once the three-digit sequence for the stem is used up.
pub(crate) fn next_kode(stem: &str, latest: Option<&str>) -> Option<String> {
    let next = latest
        .and_then(|kode| kode.strip_prefix(stem))
        .filter(|sequence| sequence.len() == SEQUENCE_WIDTH)
        .and_then(|sequence| sequence.parse::<u32>().ok())
        .map(|sequence| sequence + 1)
        .unwrap_or(1);
    (next <= MAX_SEQUENCE).then(|| format!("{stem}{next:03}"))
}
