use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 11] = [
        "RUST_LOG",
        "SE_HOST",
        "SE_PORT",
        "SE_DATABASE_URL",
        "SE_DB_MAX_CONNECTIONS",
        "SE_COUNTRY_CODE",
        "SE_EVENT_BUFFER_SIZE",
        "SE_MOBILE_MONEY_API_URL",
        "SE_MOBILE_MONEY_CALLBACK_URL",
        "SE_MOBILE_MONEY_TIMEOUT_SECS",
        "SE_MOBILE_MONEY_HMAC_CHECKS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
