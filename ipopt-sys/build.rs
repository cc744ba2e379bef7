//   Copyright 2018 Egor Larionov
//
//   Licensed under the Apache License, Version 2.0 (the "License");
//   you may not use this file except in compliance with the License.
//   You may obtain a copy of the License at
//
//       http://www.apache.org/licenses/LICENSE-2.0
//
//   Unless required by applicable law or agreed to in writing, software
//   distributed under the License is distributed on an "AS IS" BASIS,
//   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//   See the License for the specific language governing permissions and
//   limitations under the License.

/**
 * # Goals
 *
 * 1. Use an Ipopt that is already installed whenever possible. This keeps builds fast and lets
 *    developers with optimized/personalized BLAS environments use their own configuration.
 * 2. Allow this library to build on a bare CI machine by fetching a prebuilt Ipopt when the
 *    `download-prebuilt` feature is enabled.
 *
 *
 * This build file is responsible for:
 *
 * 1. Finding (or downloading) Ipopt and emitting the link flags for its standard C interface.
 * 2. Detecting the `Bool` type used by the installed C interface. Ipopt 3.14 switched it from
 *    `int` to C99 `bool`, which changes the ABI of every callback and option setter.
 *
 *
 * # Search Order
 *
 * 1. pkg-config (`ipopt.pc`).
 * 2. An explicit install prefix in `IPOPT_DIR` (or a bare library directory in `IPOPT_LIB_DIR`).
 * 3. With `download-prebuilt`, the binaries from https://github.com/JuliaOpt/IpoptBuilder/releases
 *    which are referenced on the official Ipopt webpage as a source of prebuilt binaries.
 * 4. The default linker search path.
 */
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LIBRARY: &str = "ipopt";
const MIN_VERSION: &str = "3.12.8";

/// Where the C interface header may live relative to an include directory.
const HEADER_SUBDIRS: [&str; 3] = ["coin-or", "coin", ""];
const HEADER: &str = "IpStdCInterface.h";

/// Location of the Ipopt installation we are linking against.
#[derive(Debug, Default)]
struct Install {
    include_dirs: Vec<PathBuf>,
    version: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)]
enum Error {
    NotFound,
    DownloadFailure { response_code: u32, url: String },
    UnsupportedPlatform,
    IOError,
}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Error {
        Error::IOError
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=IPOPT_DIR");
    println!("cargo:rerun-if-env-changed=IPOPT_LIB_DIR");
    println!("cargo:rustc-check-cfg=cfg(ipopt_c99_bool)");

    let install = probe_pkg_config()
        .or_else(|_| from_env_dir())
        .or_else(|_| download_and_install_prebuilt_binary())
        .unwrap_or_else(|_| link_from_system_path());

    if uses_c99_bool(&install) {
        println!("cargo:rustc-cfg=ipopt_c99_bool");
    }
}

/// Try to find Ipopt preinstalled and registered with pkg-config.
fn probe_pkg_config() -> Result<Install, Error> {
    let lib = pkg_config::Config::new()
        .atleast_version(MIN_VERSION)
        .probe(LIBRARY)
        .map_err(|_| Error::NotFound)?;

    Ok(Install {
        include_dirs: lib.include_paths,
        version: Some(lib.version),
    })
}

/// Use an install prefix given through the environment.
fn from_env_dir() -> Result<Install, Error> {
    let (lib_dir, include_dirs) = if let Ok(prefix) = env::var("IPOPT_DIR") {
        let prefix = PathBuf::from(prefix);
        (prefix.join("lib"), vec![prefix.join("include")])
    } else if let Ok(lib_dir) = env::var("IPOPT_LIB_DIR") {
        (PathBuf::from(lib_dir), Vec::new())
    } else {
        return Err(Error::NotFound);
    };

    if !lib_dir.exists() {
        return Err(Error::NotFound);
    }

    link(&lib_dir);

    Ok(Install {
        include_dirs,
        version: None,
    })
}

/// Nothing else worked, hope that the linker knows where Ipopt is.
fn link_from_system_path() -> Install {
    println!(
        "cargo:warning=Ipopt not found through pkg-config or IPOPT_DIR, \
         linking against lib{} from the default search path",
        LIBRARY
    );
    println!("cargo:rustc-link-lib=dylib={}", LIBRARY);

    let include_dirs = ["/usr/include", "/usr/local/include", "/opt/homebrew/include"]
        .iter()
        .map(PathBuf::from)
        .collect();

    Install {
        include_dirs,
        version: None,
    }
}

fn link(lib_dir: &Path) {
    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib=dylib={}", LIBRARY);
    // Let test binaries find the shared library without touching LD_LIBRARY_PATH.
    #[cfg(any(target_os = "linux", target_os = "macos"))]
    println!("cargo:rustc-link-arg=-Wl,-rpath,{}", lib_dir.display());
}

/// Decide whether the C interface passes `Bool` as C99 `bool` rather than `int`.
fn uses_c99_bool(install: &Install) -> bool {
    for dir in install.include_dirs.iter() {
        for sub in HEADER_SUBDIRS.iter() {
            let header = dir.join(sub).join(HEADER);
            if let Ok(source) = fs::read_to_string(&header) {
                return source.contains("typedef bool Bool")
                    || source.contains("bool new_x")
                    || source.contains("<stdbool.h>");
            }
        }
    }

    install
        .version
        .as_deref()
        .map(|v| version_at_least(v, (3, 14)))
        .unwrap_or(false)
}

fn version_at_least(version: &str, (major, minor): (u32, u32)) -> bool {
    let mut parts = version
        .split('.')
        .map(|p| p.trim().parse::<u32>().unwrap_or(0));
    let found = (parts.next().unwrap_or(0), parts.next().unwrap_or(0));
    found >= (major, minor)
}

#[cfg(not(feature = "download-prebuilt"))]
fn download_and_install_prebuilt_binary() -> Result<Install, Error> {
    Err(Error::NotFound)
}

#[cfg(feature = "download-prebuilt")]
use prebuilt::download_and_install_prebuilt_binary;

#[cfg(feature = "download-prebuilt")]
mod prebuilt {
    use super::{link, Error, Install, LIBRARY};
    use curl::easy::Easy;
    use flate2::read::GzDecoder;
    use std::fs::{self, File};
    use std::io::{BufWriter, Write};
    use std::env;
    use std::path::{Path, PathBuf};
    use tar::Archive;

    const VERSION: &str = "3.12.10";
    const BINARY_DL_URL: &str = "https://github.com/JuliaOpt/IpoptBuilder/releases/download/";

    #[cfg(target_os = "macos")]
    const LIB_EXT: &str = "dylib";
    #[cfg(target_os = "macos")]
    const BINARY_SUFFIX: Option<&str> = Some("x86_64-apple-darwin14.tar.gz");

    #[cfg(target_os = "linux")]
    const LIB_EXT: &str = "so";
    #[cfg(target_os = "linux")]
    const BINARY_SUFFIX: Option<&str> = Some("x86_64-linux-gnu-gcc8.tar.gz");

    #[cfg(target_os = "windows")]
    const LIB_EXT: &str = "dll";
    #[cfg(target_os = "windows")]
    const BINARY_SUFFIX: Option<&str> = Some("x86_64-w64-mingw32-gcc8.tar.gz");

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    const LIB_EXT: &str = "";
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    const BINARY_SUFFIX: Option<&str> = None;

    /// Download the ipopt prebuilt binary from JuliaOpt and install it into `OUT_DIR`.
    pub fn download_and_install_prebuilt_binary() -> Result<Install, Error> {
        let suffix = BINARY_SUFFIX.ok_or(Error::UnsupportedPlatform)?;
        let file_name = format!("IpoptBuilder.v{}.{}", VERSION, suffix);
        let url = format!("{}v{}-1-static/{}", BINARY_DL_URL, VERSION, file_name);

        let output = PathBuf::from(env::var("OUT_DIR").map_err(|_| Error::IOError)?);
        let download_dir = output.join(format!("ipopt-{}-binaries", VERSION));
        fs::create_dir_all(&download_dir)?;

        let tarball_path = download_dir.join(&file_name);
        download_tarball(&tarball_path, &url)?;
        extract_tarball(&tarball_path, &download_dir)?;

        let lib_dir = download_dir.join("lib");
        let library_file = format!("lib{}.{}", LIBRARY, LIB_EXT);
        if !lib_dir.join(&library_file).exists() {
            return Err(Error::NotFound);
        }

        link(&lib_dir);

        Ok(Install {
            include_dirs: vec![download_dir.join("include")],
            version: Some(VERSION.to_string()),
        })
    }

    /// Download a tarball if it doesn't already exist.
    fn download_tarball(tarball_path: &Path, binary_url: &str) -> Result<(), Error> {
        if tarball_path.exists() {
            return Ok(());
        }

        let download_failure = |response_code| Error::DownloadFailure {
            response_code,
            url: binary_url.to_string(),
        };

        let f = File::create(tarball_path)?;
        let mut writer = BufWriter::new(f);
        let mut easy = Easy::new();
        easy.url(binary_url).map_err(|_| download_failure(0))?;
        easy.follow_location(true).map_err(|_| download_failure(0))?;
        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| Ok(writer.write_all(data).map_or(0, |_| data.len())))
                .map_err(|_| download_failure(0))?;
            transfer.perform().map_err(|_| download_failure(0))?;
        }
        writer.flush()?;

        let response_code = easy.response_code().unwrap_or(0);
        if response_code != 200 {
            let _ = fs::remove_file(tarball_path);
            return Err(download_failure(response_code));
        }

        Ok(())
    }

    fn extract_tarball<P: AsRef<Path>, P2: AsRef<Path>>(
        archive_path: P,
        extract_to: P2,
    ) -> Result<(), Error> {
        let file = File::open(archive_path)?;
        let mut a = Archive::new(GzDecoder::new(file));
        a.unpack(extract_to)?;
        Ok(())
    }
}
