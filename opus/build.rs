fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_LIBOPUS").is_none() {
        return;
    }

    // pkg-config emits the link directives itself when it finds the library.
    if pkg_config::Config::new().probe("opus").is_ok() {
        return;
    }

    println!("cargo:rustc-link-search=native=/opt/homebrew/lib");
    println!("cargo:rustc-link-search=native=/usr/local/lib");
    println!("cargo:rustc-link-lib=opus");
}
