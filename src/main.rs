#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
    renovki_dashboard::desktop::run()
}
