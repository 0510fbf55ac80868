#![no_main]

use libfuzzer_sys::fuzz_target;
use party_rooms::config::SettingsBounds;

fuzz_target!(|data: &[u8]| {
    // Raw-byte path, including serde_json's UTF-8 validation.
    let _ = serde_json::from_slice::<party_rooms::protocol::ClientMessage>(data);

    // The full inbound path: parse plus settings range checks.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = party_rooms::parse_client_message(s, &SettingsBounds::default());
    }
});
