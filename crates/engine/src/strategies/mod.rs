//! 탐지 전략 구현 모음
//!
//! 각 전략은 서로 독립적이며 프로젝트 루트를 읽기 전용으로 스캔합니다.
//!
//! # 전략 목록
//!
//! | 모듈 | 입력 | 간선 생산 |
//! |---|---|---|
//! | [`compile_commands`] | compile_commands.json | X |
//! | [`linker_map`] | MSVC/GNU .map 파일 | O |
//! | [`conan`] | conan.lock, conanfile.txt/py | O |
//! | [`conan_graph`] | `conan graph info` JSON | O |
//! | [`vcpkg`] | vcpkg.json, vcpkg-lock.json, status | X |
//! | [`cmake`] | CMakeCache.txt, CMakeLists.txt | X |
//! | [`meson`] | meson.build, *.wrap | X |
//! | [`build_logs`] | link.txt, .tlog, build.ninja, Makefile | X |
//! | [`cmake_configure`] | 미리 생성된 cmake 빌드 디렉토리 | X |
//! | [`binary_edges`] | .so / .dll / .lib 바이너리 | O |
//! | [`ldd`] | ldd-results.json | O |
//! | [`headers`] | C/C++ 소스의 #include | X |

pub mod binary_edges;
pub mod build_logs;
pub mod cmake;
pub mod cmake_configure;
pub mod compile_commands;
pub mod conan;
pub mod conan_graph;
pub mod headers;
pub mod ldd;
pub mod linker_map;
pub mod meson;
pub mod vcpkg;

pub use binary_edges::BinaryEdgesStrategy;
pub use build_logs::BuildLogsStrategy;
pub use cmake::CMakeStrategy;
pub use cmake_configure::CMakeConfigureStrategy;
pub use compile_commands::CompileCommandsStrategy;
pub use conan::ConanStrategy;
pub use conan_graph::ConanGraphStrategy;
pub use headers::{scan_version_hints, HeadersStrategy};
pub use ldd::LddStrategy;
pub use linker_map::LinkerMapStrategy;
pub use meson::MesonStrategy;
pub use vcpkg::VcpkgStrategy;

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use cppbom_core::fingerprints;
use cppbom_core::model::{push_unique, Component};
use cppbom_core::paths;

/// 외부 include 경로와 링크 라이브러리 집합을 핑거프린트 DB에 대조해
/// 컴포넌트 목록을 만듭니다. 경로/라이브러리명에서 버전도 추론합니다.
pub(crate) fn build_components_from_paths(
    includes: &BTreeSet<String>,
    libs: &BTreeSet<String>,
    source: &str,
) -> Vec<Component> {
    let mut seen: BTreeMap<&'static str, Component> = BTreeMap::new();

    for inc_path in includes {
        let Some(fp) = fingerprints::match_library(inc_path) else {
            continue;
        };
        let c = seen.entry(fp.name).or_insert_with(|| Component {
            name: fp.name.to_owned(),
            version: "unknown".to_owned(),
            purl: fp.purl.to_owned(),
            detection_source: source.to_owned(),
            description: fp.description.to_owned(),
            ..Component::default()
        });
        push_unique(&mut c.include_paths, inc_path.as_str());
        if c.version == "unknown" {
            if let Some(v) = paths::extract_version_from_path(inc_path) {
                c.purl = format!("{}@{v}", fp.purl);
                c.version = v;
            }
        }
    }

    for lib in libs {
        let Some(fp) = fingerprints::match_library(lib) else {
            continue;
        };
        let c = seen.entry(fp.name).or_insert_with(|| Component {
            name: fp.name.to_owned(),
            version: "unknown".to_owned(),
            purl: fp.purl.to_owned(),
            detection_source: source.to_owned(),
            description: fp.description.to_owned(),
            ..Component::default()
        });
        push_unique(&mut c.link_libraries, lib.as_str());
        if c.version == "unknown" {
            if let Some(v) = paths::extract_version_from_lib_name(lib) {
                c.purl = format!("{}@{v}", fp.purl);
                c.version = v;
            }
        }
    }

    seen.into_values().collect()
}

/// 서드파티 의존성으로 보고하지 않을 시스템/libc 라이브러리 접두사.
/// libz는 의도적으로 제외합니다 -- 핑거프린트 DB가 판단합니다.
const SYSTEM_LIB_PREFIXES: &[&str] = &[
    "libc.so", "libm.so", "libdl.so", "libpthread.so", "librt.so",
    "libstdc++.so", "libgcc_s.so", "ld-linux", "ld-musl",
    "libgomp.so", "libquadmath.so", "libgfortran.so",
    "linux-vdso.so", "linux-gate.so",
    "libutil.so", "libresolv.so", "libnss", "libnsl.so",
];

/// 잘 알려진 시스템/libc 라이브러리 이름이면 true를 반환합니다.
pub(crate) fn is_system_lib(name: &str) -> bool {
    let lower = name.to_lowercase();
    SYSTEM_LIB_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// 서드파티로 취급하지 않을 MSVC C 런타임 / Win32 시스템 라이브러리 이름
const CRT_LIBS: &[&str] = &[
    "libcmt", "libcmtd", "msvcrt", "msvcrtd", "vcruntime", "vcruntimed",
    "ucrt", "ucrtd", "oldnames", "kernel32", "user32", "advapi32", "shell32",
    "ole32", "oleaut32", "uuid", "comdlg32", "winspool", "gdi32", "ws2_32",
    "ntdll", "ntoskrnl",
];

/// MSVC CRT / Win32 시스템 라이브러리 이름이면 true를 반환합니다.
pub(crate) fn is_crt_lib(name: &str) -> bool {
    let lower = name.to_lowercase();
    CRT_LIBS.contains(&lower.as_str())
}
