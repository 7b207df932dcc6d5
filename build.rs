fn main() {
    // Only device builds need the ESP-IDF environment; host builds run the
    // simulation and the test suite.
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }
}
