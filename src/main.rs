#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

#[cfg(feature = "gui")]
fn main() {
    daymark_tauri::run()
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("daymark-tauri was built without the `gui` feature; nothing to run");
}
