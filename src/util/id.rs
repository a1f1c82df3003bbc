use std::time::{Duration, SystemTime};

/// Mint a short base36 identifier for ephemeral resource names.
///
/// Every name that crosses a container boundary (image tag, agent socket,
/// GITHUB_OUTPUT path) embeds one of these so concurrent tests never share a
/// resource. Entropy comes from the OS RNG, mixed with time and pid so ids
/// stay distinct even if the RNG source fails.
pub fn unique_id() -> String {
    let mut buf = [0u8; 8];
    let _ = getrandom::getrandom(&mut buf);
    let rand = u128::from(u64::from_le_bytes(buf));
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let pid = u128::from(std::process::id());
    let mix = rand ^ now.as_nanos() ^ (pid << 32);
    // base36 encode the low 48 bits for brevity
    let mut v = (mix & 0xffff_ffff_ffff) as u64;
    let alphabet = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut s = String::new();
    if v == 0 {
        s.push('0');
    }
    while v > 0 {
        let idx = (v % 36) as usize;
        s.push(alphabet[idx] as char);
        v /= 36;
    }
    s.chars().rev().collect()
}
