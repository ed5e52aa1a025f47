fn main() {
    // First-run answers are baked in with option_env!.
    for var in [
        "RAINBYPASS_WIFI_SSID",
        "RAINBYPASS_WIFI_PASS",
        "RAINBYPASS_LAT",
        "RAINBYPASS_LON",
        "RAINBYPASS_LOOK_AHEAD",
        "RAINBYPASS_LOOK_BEHIND",
        "RAINBYPASS_LIMIT",
        "RAINBYPASS_VALVE_SENSOR",
    ] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // ESP-IDF link arguments are only needed for the device binary.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
