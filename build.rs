fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=NUMBLAS_BLAS_LIB");

    // The portable routines need no native code.
    if std::env::var_os("CARGO_FEATURE_BLAS").is_none() {
        return;
    }

    if let Ok(library) = std::env::var("NUMBLAS_BLAS_LIB") {
        println!("cargo:rustc-link-lib={}", library);
        return;
    }

    // Conditional linkage depending on the target operating system.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "macos" | "ios" => println!("cargo:rustc-link-lib=framework=Accelerate"),
        "windows" => println!("cargo:rustc-link-lib=libopenblas"),
        _ => println!("cargo:rustc-link-lib=openblas"),
    }
}
