const SECRET_KEYS: [&str; 4] = [
    "WIFI_SSID",
    "WIFI_PASSWORD",
    "THINGSPEAK_CHANNEL_ID",
    "THINGSPEAK_WRITE_KEY",
];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    for key in SECRET_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    // values already in the environment win over .env
    if let Err(e) = dotenvy::dotenv() {
        println!("cargo:warning=.env not loaded: {e}");
    }

    for key in SECRET_KEYS {
        let value = std::env::var(key).unwrap_or_else(|_| {
            println!("cargo:warning={key} is not set, building with an empty value");
            String::new()
        });
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
