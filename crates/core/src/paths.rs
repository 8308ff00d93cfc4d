//! 경로 유틸리티 -- 외부 경로 판별과 버전 추출
//!
//! 모든 전략이 공유하는 헬퍼입니다. 경로가 프로젝트 루트 밖(외부)인지
//! 판별하고, 경로 조각이나 라이브러리 파일명에서 버전 문자열을
//! 추출하며, 라이브러리 파일명을 패키지 식별자로 변환합니다.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::fingerprints;

/// 경로 비교용 정규화: 역슬래시를 슬래시로, 소문자로 변환합니다.
fn normalize_for_compare(p: &str) -> String {
    p.replace('\\', "/").to_lowercase()
}

/// `/`로 시작하거나 드라이브 문자(`C:/`, `C:\`)로 시작하면 절대 경로로
/// 취급합니다. 호스트 OS와 무관하게 판정합니다 (크로스 컴파일 산출물 대응).
fn is_absolute_like(p: &str) -> bool {
    if p.starts_with('/') {
        return true;
    }
    let bytes = p.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// 어휘적 경로 정리: `.` 제거, 가능한 `..` 해소.
///
/// 스택 밑으로 내려가는 `..`(루트 위로 탈출)는 해소하지 않고 그대로
/// 남깁니다 -- 해소 불가능한 크로스 컴파일 경로의 어휘적 폴백입니다.
fn lexical_clean(p: &str) -> String {
    let norm = normalize_for_compare(p);
    let absolute = norm.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for part in norm.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                match stack.last() {
                    Some(&top) if top != ".." && !top.ends_with(':') => {
                        stack.pop();
                    }
                    _ => stack.push(part),
                }
            }
            _ => stack.push(part),
        }
    }

    let joined = stack.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// 경로가 프로젝트 루트 밖에 있으면 true를 반환합니다.
///
/// 두 경로를 절대화·정규화(소문자, 슬래시 통일)한 뒤 루트가 접두사인지
/// 검사합니다. 상대 경로는 프로젝트 루트를 기준으로 절대화합니다.
pub fn is_external_path(path: &str, project_root: &Path) -> bool {
    if path.is_empty() {
        return false;
    }

    let root_str = project_root.display().to_string();
    let abs = if is_absolute_like(path) {
        lexical_clean(path)
    } else {
        lexical_clean(&format!("{root_str}/{path}"))
    };

    let root = lexical_clean(&root_str);
    abs != root && !abs.starts_with(&format!("{root}/"))
}

/// 라이브러리 경로가 프로젝트 루트 밖에 있으면 true를 반환합니다.
///
/// [`is_external_path`]와 달리 `..` 조각을 일절 해소하지 않는 순수
/// 어휘적 검사입니다. 일부 호스트에서 경로 해석이 실패하는
/// 크로스 컴파일 링커 출력에 사용합니다. 예:
///
/// ```text
/// c:/toolchain/.../bin/../lib/gcc/arm-none-eabi/10.3.1/../../../../arm-none-eabi/lib/...
/// ```
///
/// 절대 경로가 아니면 외부로 취급하지 않습니다.
pub fn is_external_lib_path(path: &str, project_root: &Path) -> bool {
    if path.is_empty() {
        return false;
    }
    if !is_absolute_like(path) {
        return false;
    }

    let norm_path = normalize_for_compare(path);
    let mut norm_root = normalize_for_compare(&project_root.display().to_string());
    if !norm_root.ends_with('/') {
        norm_root.push('/');
    }
    !norm_path.starts_with(&norm_root)
}

/// 경로 조각 안의 버전 패턴: boost_1_82_0, openssl-3.1.4, zlib-1.2.11
static VERSION_IN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_](\d+)[._](\d+)(?:[._](\d+))?").expect("valid regex"));

/// MSVC 장식 라이브러리명 끝의 버전 패턴: boost_system-vc143-mt-x64-1_82.lib
static VERSION_IN_LIB_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_](\d+)[._](\d+)(?:[._](\d+))?(?:\.lib|\.a)?$").expect("valid regex"));

fn version_from_captures(caps: &regex::Captures<'_>) -> String {
    let mut v = format!(
        "{}.{}",
        caps.get(1).map_or("", |m| m.as_str()),
        caps.get(2).map_or("", |m| m.as_str())
    );
    if let Some(patch) = caps.get(3) {
        v.push('.');
        v.push_str(patch.as_str());
    }
    v
}

/// 경로 조각들에서 버전 문자열을 추출합니다.
/// `/boost/1.82.0/`, `boost_1_82_0` 같은 패턴을 조각 단위로 검사합니다.
pub fn extract_version_from_path(path: &str) -> Option<String> {
    let slashed = path.replace('\\', "/");
    for part in slashed.split('/') {
        if let Some(caps) = VERSION_IN_PATH.captures(part) {
            return Some(version_from_captures(&caps));
        }
    }
    None
}

/// 라이브러리 파일명 끝에서 버전 문자열을 추출합니다.
pub fn extract_version_from_lib_name(lib: &str) -> Option<String> {
    VERSION_IN_LIB_NAME
        .captures(lib)
        .map(|caps| version_from_captures(&caps))
}

/// 라이브러리 파일명에서 도출한 패키지 식별자
///
/// 핑거프린트 매칭에 성공하면 정식 이름/PURL/설명을 갖고,
/// 실패하면 정리된 파일명 기반의 generic 식별자를 갖습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub name: String,
    pub purl: String,
    pub description: String,
}

/// 라이브러리 파일명(예: "libssl.so.3", "ssl.dll", "libssl.a")을
/// 패키지 식별자로 변환합니다.
///
/// 핑거프린트 DB를 먼저 조회하고(접두사/확장자를 정리한 이름, 그다음
/// 원본 이름), 모두 실패하면 정리된 파일명 그대로의 generic 패키지를
/// 반환합니다. 이름이 비면 `None`.
pub fn lib_name_to_package(lib_name: &str) -> Option<PackageIdentity> {
    let mut base = lib_name.to_lowercase();

    // 버전 붙은 확장자 제거: libssl.so.3.1.4 -> libssl
    if let Some(idx) = base.find(".so") {
        base.truncate(idx);
    }
    for suffix in [".dll", ".lib", ".a", ".dylib"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped.to_owned();
        }
    }

    if base.is_empty() {
        return None;
    }

    // "lib" 접두사를 뗀 이름으로 먼저 핑거프린트 조회
    let trimmed = base.strip_prefix("lib").unwrap_or(&base);
    if !trimmed.is_empty() {
        if let Some(fp) = fingerprints::match_library(trimmed) {
            return Some(PackageIdentity {
                name: fp.name.to_owned(),
                purl: fp.purl.to_owned(),
                description: fp.description.to_owned(),
            });
        }
    }
    if let Some(fp) = fingerprints::match_library(lib_name) {
        return Some(PackageIdentity {
            name: fp.name.to_owned(),
            purl: fp.purl.to_owned(),
            description: fp.description.to_owned(),
        });
    }

    // 핑거프린트 미등록 라이브러리는 generic 패키지로 보고
    // (임베디드 툴체인의 libgcc, libnosys 등)
    Some(PackageIdentity {
        purl: format!("pkg:generic/{base}"),
        name: base,
        description: String::new(),
    })
}
