//! 핑거프린트 DB -- 알려진 C/C++ 서드파티 라이브러리 정적 테이블
//!
//! 각 항목은 라이브러리의 정식 이름을 include/library 경로 조각과
//! 특징적인 헤더 파일명에 매핑합니다. 컴파일러 아티팩트가 없을 때의
//! 폴백 탐지 수단이며, 프로세스 전역 읽기 전용 데이터입니다. I/O 없음.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// 알려진 C/C++ 라이브러리를 인식하는 방법
#[derive(Debug)]
pub struct LibraryFingerprint {
    /// 정식 라이브러리 이름
    pub name: &'static str,
    /// include/library 경로에 나타나는 부분 문자열
    pub path_segments: &'static [&'static str],
    /// 특징적인 헤더 파일명 또는 접두사
    pub headers: &'static [&'static str],
    /// Package URL 접두사 (예: "pkg:conan/boost")
    pub purl: &'static str,
    pub description: &'static str,
}

/// 내장 핑거프린트 데이터베이스
///
/// 테이블 순서가 동률 판정 기준입니다. 첫 매칭이 승리합니다.
pub static KNOWN_LIBRARIES: &[LibraryFingerprint] = &[
    LibraryFingerprint {
        name: "boost",
        path_segments: &["boost"],
        headers: &["boost/"],
        purl: "pkg:conan/boost",
        description: "Boost C++ Libraries",
    },
    LibraryFingerprint {
        name: "openssl",
        path_segments: &["openssl", "ssl", "crypto"],
        headers: &["openssl/", "ssl.h", "crypto.h"],
        purl: "pkg:conan/openssl",
        description: "OpenSSL cryptography library",
    },
    LibraryFingerprint {
        name: "zlib",
        path_segments: &["zlib"],
        headers: &["zlib.h"],
        purl: "pkg:conan/zlib",
        description: "zlib compression library",
    },
    LibraryFingerprint {
        name: "libcurl",
        path_segments: &["curl", "libcurl"],
        headers: &["curl/curl.h", "curl/"],
        purl: "pkg:conan/libcurl",
        description: "libcurl - the multiprotocol file transfer library",
    },
    LibraryFingerprint {
        name: "sqlite3",
        path_segments: &["sqlite", "sqlite3"],
        headers: &["sqlite3.h"],
        purl: "pkg:conan/sqlite3",
        description: "SQLite embedded database",
    },
    LibraryFingerprint {
        name: "googletest",
        path_segments: &["gtest", "googletest", "googlemock"],
        headers: &["gtest/gtest.h", "gmock/gmock.h"],
        purl: "pkg:github/google/googletest",
        description: "Google Test C++ testing framework",
    },
    LibraryFingerprint {
        name: "nlohmann-json",
        path_segments: &["nlohmann"],
        headers: &["nlohmann/json.hpp", "nlohmann/"],
        purl: "pkg:github/nlohmann/json",
        description: "JSON for Modern C++",
    },
    LibraryFingerprint {
        name: "eigen",
        path_segments: &["eigen", "Eigen"],
        headers: &["Eigen/", "eigen3/"],
        purl: "pkg:conan/eigen",
        description: "Eigen linear algebra library",
    },
    LibraryFingerprint {
        name: "protobuf",
        path_segments: &["protobuf", "google/protobuf"],
        headers: &["google/protobuf/", "protobuf/"],
        purl: "pkg:conan/protobuf",
        description: "Google Protocol Buffers",
    },
    LibraryFingerprint {
        name: "grpc",
        path_segments: &["grpc", "grpcpp"],
        headers: &["grpc/grpc.h", "grpcpp/"],
        purl: "pkg:conan/grpc",
        description: "gRPC remote procedure call framework",
    },
    LibraryFingerprint {
        name: "abseil",
        path_segments: &["absl", "abseil"],
        headers: &["absl/"],
        purl: "pkg:conan/abseil",
        description: "Abseil C++ Common Libraries",
    },
    LibraryFingerprint {
        name: "fmt",
        path_segments: &["fmt"],
        headers: &["fmt/format.h", "fmt/core.h", "fmt/"],
        purl: "pkg:conan/fmt",
        description: "{fmt} formatting library",
    },
    LibraryFingerprint {
        name: "spdlog",
        path_segments: &["spdlog"],
        headers: &["spdlog/spdlog.h", "spdlog/"],
        purl: "pkg:conan/spdlog",
        description: "Fast C++ logging library",
    },
    LibraryFingerprint {
        name: "catch2",
        path_segments: &["catch2", "Catch2"],
        headers: &["catch2/catch.hpp", "catch2/catch_all.hpp"],
        purl: "pkg:conan/catch2",
        description: "Catch2 C++ test framework",
    },
    LibraryFingerprint {
        name: "libuv",
        path_segments: &["libuv", "uv"],
        headers: &["uv.h", "uv/"],
        purl: "pkg:conan/libuv",
        description: "libuv asynchronous I/O library",
    },
    LibraryFingerprint {
        name: "libpng",
        path_segments: &["libpng", "png"],
        headers: &["png.h", "libpng/"],
        purl: "pkg:conan/libpng",
        description: "libpng PNG image library",
    },
    LibraryFingerprint {
        name: "libjpeg",
        path_segments: &["libjpeg", "jpeg"],
        headers: &["jpeglib.h", "jerror.h"],
        purl: "pkg:conan/libjpeg",
        description: "libjpeg JPEG image library",
    },
    LibraryFingerprint {
        name: "opencv",
        path_segments: &["opencv", "opencv2"],
        headers: &["opencv2/", "opencv/"],
        purl: "pkg:conan/opencv",
        description: "OpenCV computer vision library",
    },
    LibraryFingerprint {
        name: "poco",
        path_segments: &["Poco", "poco"],
        headers: &["Poco/"],
        purl: "pkg:conan/poco",
        description: "POCO C++ Libraries",
    },
    LibraryFingerprint {
        name: "qt",
        path_segments: &["Qt5", "Qt6", "QtCore", "QtWidgets"],
        headers: &["QtCore/", "QtWidgets/", "QtGui/", "QObject"],
        purl: "pkg:conan/qt",
        description: "Qt application framework",
    },
    LibraryFingerprint {
        name: "wxwidgets",
        path_segments: &["wx", "wxWidgets"],
        headers: &["wx/wx.h", "wx/"],
        purl: "pkg:conan/wxwidgets",
        description: "wxWidgets cross-platform GUI library",
    },
    LibraryFingerprint {
        name: "tbb",
        path_segments: &["tbb", "oneapi/tbb"],
        headers: &["tbb/tbb.h", "tbb/", "oneapi/tbb/"],
        purl: "pkg:conan/onetbb",
        description: "Intel Threading Building Blocks",
    },
    LibraryFingerprint {
        name: "glfw",
        path_segments: &["glfw", "GLFW"],
        headers: &["GLFW/glfw3.h"],
        purl: "pkg:conan/glfw",
        description: "GLFW OpenGL windowing library",
    },
    LibraryFingerprint {
        name: "glm",
        path_segments: &["glm"],
        headers: &["glm/glm.hpp", "glm/"],
        purl: "pkg:conan/glm",
        description: "OpenGL Mathematics library",
    },
    LibraryFingerprint {
        name: "rapidjson",
        path_segments: &["rapidjson"],
        headers: &["rapidjson/document.h", "rapidjson/"],
        purl: "pkg:conan/rapidjson",
        description: "RapidJSON fast JSON parser/generator",
    },
    LibraryFingerprint {
        name: "yaml-cpp",
        path_segments: &["yaml-cpp", "yaml_cpp"],
        headers: &["yaml-cpp/yaml.h"],
        purl: "pkg:conan/yaml-cpp",
        description: "yaml-cpp YAML parser",
    },
    LibraryFingerprint {
        name: "pugixml",
        path_segments: &["pugixml"],
        headers: &["pugixml.hpp"],
        purl: "pkg:conan/pugixml",
        description: "pugixml XML parser",
    },
    LibraryFingerprint {
        name: "tinyxml2",
        path_segments: &["tinyxml2"],
        headers: &["tinyxml2.h"],
        purl: "pkg:conan/tinyxml2",
        description: "TinyXML-2 XML parser",
    },
    LibraryFingerprint {
        name: "zstd",
        path_segments: &["zstd"],
        headers: &["zstd.h"],
        purl: "pkg:conan/zstd",
        description: "Zstandard compression library",
    },
    LibraryFingerprint {
        name: "lz4",
        path_segments: &["lz4"],
        headers: &["lz4.h", "lz4frame.h"],
        purl: "pkg:conan/lz4",
        description: "LZ4 compression library",
    },
    LibraryFingerprint {
        name: "flatbuffers",
        path_segments: &["flatbuffers"],
        headers: &["flatbuffers/flatbuffers.h", "flatbuffers/"],
        purl: "pkg:conan/flatbuffers",
        description: "FlatBuffers serialization library",
    },
    LibraryFingerprint {
        name: "msgpack",
        path_segments: &["msgpack"],
        headers: &["msgpack.hpp", "msgpack/"],
        purl: "pkg:conan/msgpack-cxx",
        description: "MessagePack serialization library",
    },
    LibraryFingerprint {
        name: "asio",
        path_segments: &["asio"],
        headers: &["asio.hpp", "asio/"],
        purl: "pkg:conan/asio",
        description: "Asio C++ asynchronous networking library",
    },
    LibraryFingerprint {
        name: "websocketpp",
        path_segments: &["websocketpp"],
        headers: &["websocketpp/"],
        purl: "pkg:conan/websocketpp",
        description: "WebSocket++ library",
    },
    LibraryFingerprint {
        name: "benchmark",
        path_segments: &["benchmark"],
        headers: &["benchmark/benchmark.h"],
        purl: "pkg:github/google/benchmark",
        description: "Google Benchmark microbenchmark library",
    },
    LibraryFingerprint {
        name: "cereal",
        path_segments: &["cereal"],
        headers: &["cereal/cereal.hpp", "cereal/"],
        purl: "pkg:conan/cereal",
        description: "cereal C++ serialization library",
    },
    LibraryFingerprint {
        name: "cxxopts",
        path_segments: &["cxxopts"],
        headers: &["cxxopts.hpp"],
        purl: "pkg:conan/cxxopts",
        description: "cxxopts command-line option parser",
    },
    LibraryFingerprint {
        name: "CLI11",
        path_segments: &["CLI11", "CLI"],
        headers: &["CLI/CLI.hpp"],
        purl: "pkg:conan/cli11",
        description: "CLI11 command-line parser",
    },
    LibraryFingerprint {
        name: "re2",
        path_segments: &["re2"],
        headers: &["re2/re2.h"],
        purl: "pkg:conan/re2",
        description: "RE2 regular expression library",
    },
    LibraryFingerprint {
        name: "leveldb",
        path_segments: &["leveldb"],
        headers: &["leveldb/db.h", "leveldb/"],
        purl: "pkg:conan/leveldb",
        description: "LevelDB key-value storage",
    },
    LibraryFingerprint {
        name: "rocksdb",
        path_segments: &["rocksdb"],
        headers: &["rocksdb/db.h", "rocksdb/"],
        purl: "pkg:conan/rocksdb",
        description: "RocksDB embedded database",
    },
    LibraryFingerprint {
        name: "libsodium",
        path_segments: &["sodium", "libsodium"],
        headers: &["sodium.h", "sodium/"],
        purl: "pkg:conan/libsodium",
        description: "libsodium cryptography library",
    },
    LibraryFingerprint {
        name: "mbedtls",
        path_segments: &["mbedtls"],
        headers: &["mbedtls/ssl.h", "mbedtls/"],
        purl: "pkg:conan/mbedtls",
        description: "Mbed TLS cryptography library",
    },
    LibraryFingerprint {
        name: "libevent",
        path_segments: &["libevent", "event"],
        headers: &["event2/event.h", "event.h"],
        purl: "pkg:conan/libevent",
        description: "libevent event notification library",
    },
    LibraryFingerprint {
        name: "folly",
        path_segments: &["folly"],
        headers: &["folly/"],
        purl: "pkg:conan/folly",
        description: "Facebook Open-source Library",
    },
    LibraryFingerprint {
        name: "arrow",
        path_segments: &["arrow"],
        headers: &["arrow/api.h", "arrow/"],
        purl: "pkg:conan/arrow",
        description: "Apache Arrow columnar data format",
    },
];

/// 제외 대상인 C/C++ 표준 라이브러리 헤더 집합
static STDLIB_HEADERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // C standard library
        "assert.h", "complex.h", "ctype.h", "errno.h", "fenv.h", "float.h",
        "inttypes.h", "iso646.h", "limits.h", "locale.h", "math.h", "setjmp.h",
        "signal.h", "stdalign.h", "stdarg.h", "stdatomic.h", "stdbool.h",
        "stddef.h", "stdint.h", "stdio.h", "stdlib.h", "stdnoreturn.h",
        "string.h", "tgmath.h", "threads.h", "time.h", "uchar.h", "wchar.h",
        "wctype.h",
        // POSIX
        "unistd.h", "fcntl.h", "sys/types.h", "sys/stat.h", "sys/socket.h",
        "sys/wait.h", "sys/mman.h", "sys/time.h", "sys/ioctl.h",
        "sys/select.h", "netinet/in.h", "arpa/inet.h", "netdb.h", "pthread.h",
        "semaphore.h", "dirent.h", "dlfcn.h", "poll.h", "termios.h",
        // Windows
        "windows.h", "winsock2.h", "ws2tcpip.h", "winbase.h", "windef.h",
        "winnt.h", "shellapi.h", "shlobj.h", "commctrl.h",
        // C++ standard library
        "algorithm", "any", "array", "atomic", "barrier", "bit", "bitset",
        "cassert", "cctype", "cerrno", "cfenv", "cfloat", "charconv",
        "chrono", "cinttypes", "climits", "clocale", "cmath", "codecvt",
        "compare", "complex", "concepts", "condition_variable", "coroutine",
        "csetjmp", "csignal", "cstdarg", "cstddef", "cstdint", "cstdio",
        "cstdlib", "cstring", "ctime", "cuchar", "cwchar", "cwctype", "deque",
        "exception", "execution", "expected", "filesystem", "format",
        "forward_list", "fstream", "functional", "future", "generator",
        "initializer_list", "iomanip", "ios", "iosfwd", "iostream", "istream",
        "iterator", "latch", "limits", "list", "locale", "map", "memory",
        "memory_resource", "mutex", "new", "numbers", "numeric", "optional",
        "ostream", "print", "queue", "random", "ranges", "ratio", "regex",
        "scoped_allocator", "semaphore", "set", "shared_mutex",
        "source_location", "span", "spanstream", "sstream", "stack",
        "stacktrace", "stdexcept", "stdfloat", "stop_token", "streambuf",
        "string", "string_view", "strstream", "syncstream", "system_error",
        "thread", "tuple", "type_traits", "typeindex", "typeinfo",
        "unordered_map", "unordered_set", "utility", "valarray", "variant",
        "vector", "version",
    ]
    .into_iter()
    .collect()
});

/// 주어진 include 이름이 표준 라이브러리 헤더인지 반환합니다.
pub fn is_stdlib_header(include: &str) -> bool {
    STDLIB_HEADERS.contains(include.trim())
}

/// 경로 조각 또는 헤더가 매칭되는 첫 [`LibraryFingerprint`]를 반환합니다.
///
/// 대소문자를 무시한 부분 문자열 매칭입니다. 매칭이 없으면 `None`.
pub fn match_library(s: &str) -> Option<&'static LibraryFingerprint> {
    let lower = s.to_lowercase();
    for fp in KNOWN_LIBRARIES {
        for seg in fp.path_segments {
            if lower.contains(&seg.to_lowercase()) {
                return Some(fp);
            }
        }
        for hdr in fp.headers {
            if lower.contains(&hdr.to_lowercase()) {
                return Some(fp);
            }
        }
    }
    None
}
