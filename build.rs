fn main() {
    // Propagate ESP-IDF environment for device builds.
    // On host builds (no `espidf` feature) there is nothing to emit.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
