use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(10));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(!settings.cache.coalesce_batches);
    assert_eq!(settings.generation.provider, GenerationProvider::Canned);
    assert_eq!(settings.context.timezone, Tz::UTC);
    assert!(settings.context.holiday_url.is_none());
    assert_eq!(settings.device.full_voltage, DEFAULT_FULL_VOLTAGE);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_coalesce_batches: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(settings.cache.coalesce_batches);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn openai_provider_requires_an_api_key() {
    let mut raw = RawSettings::default();
    raw.generation.provider = Some("OpenAI".to_string());

    let err = Settings::from_raw(raw.clone()).expect_err("missing key");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "generation.api_key",
            ..
        }
    ));

    raw.generation.api_key = Some("sk-test".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.generation.provider, GenerationProvider::OpenAi);
}

#[test]
fn unknown_timezone_is_rejected() {
    let mut raw = RawSettings::default();
    raw.context.timezone = Some("Mars/Olympus".to_string());

    let err = Settings::from_raw(raw).expect_err("bad timezone");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "context.timezone",
            ..
        }
    ));
}

#[test]
fn named_timezone_is_resolved() {
    let mut raw = RawSettings::default();
    raw.context.timezone = Some("Asia/Shanghai".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.context.timezone, chrono_tz::Asia::Shanghai);
}

#[test]
fn zero_timeouts_and_voltage_are_rejected() {
    let mut raw = RawSettings::default();
    raw.context.weather_timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.device.full_voltage = Some(0.0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "device.full_voltage",
            ..
        })
    ));
}

#[test]
fn blank_holiday_url_is_disabled() {
    let mut raw = RawSettings::default();
    raw.context.holiday_url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.context.holiday_url.is_none());

    let mut raw = RawSettings::default();
    raw.context.holiday_url = Some("not a url".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn ipv6_hosts_are_bracketed() {
    let addr = parse_socket_addr("::1", 8080).expect("ipv6 address");
    assert!(addr.is_ipv6());
    assert_eq!(addr.port(), 8080);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["inkcast"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "inkcast",
        "render",
        "--mac",
        "AA:BB:CC:DD:EE:FF",
        "--persona",
        "zen",
        "--voltage",
        "3.1",
        "--output",
        "/tmp/card.svg",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.mac.as_deref(), Some("AA:BB:CC:DD:EE:FF"));
            assert_eq!(render.persona.as_deref(), Some("zen"));
            assert_eq!(render.voltage, 3.1);
            assert_eq!(render.output, std::path::Path::new("/tmp/card.svg"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_defaults_to_nominal_voltage() {
    let args = CliArgs::parse_from(["inkcast", "render"]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.voltage, 3.3);
            assert!(render.mac.is_none());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "inkcast",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--generation-provider",
        "canned",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.generation_provider.as_deref(),
                Some("canned")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
