// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use crate::diagnosis::classify::Backend;
use crate::diagnosis::output::{escape, Bilingual};

pub fn starting() -> Bilingual {
    Bilingual::new("Starting ... ", "开始中……")
}

pub fn checking_readable() -> Bilingual {
    Bilingual::new(
        "Checking object cache file readable ...",
        "正在检测对象缓存文件可读性……",
    )
}

pub fn readable() -> Bilingual {
    Bilingual::new("Object cache file is readable.", "对象缓存文件可读。")
}

pub fn unreadable(path: &str) -> Bilingual {
    let path = escape(path);
    Bilingual::new(
        format!("Can not read object cache file {}.", path),
        format!("无法读取对象缓存文件 {}。", path),
    )
}

pub fn checking_type() -> Bilingual {
    Bilingual::new("Checking object cache type ...", "正在检测对象缓存类型……")
}

pub fn backend_type(backend: Backend) -> Bilingual {
    let strong = format!("<strong>{}</strong>", escape(backend.label()));
    Bilingual::new(
        format!("Object cache type is: {}.", strong),
        format!("对象缓存类型为: {}。", strong),
    )
}

pub fn unknown_terminated() -> Bilingual {
    Bilingual::new(
        "Object cache is unknown, the test has been terminated.",
        "未知类型对象缓存，测试终止。",
    )
}

pub fn starting_test() -> Bilingual {
    Bilingual::new("Starting cache test ...", "开始测试缓存……")
}

pub fn trying_set() -> Bilingual {
    Bilingual::new("Try to set cache ...", "尝试设置缓存……")
}

pub fn created() -> Bilingual {
    Bilingual::new(
        "Cache created, Please click next step ...",
        "缓存成功建立，请点击下一步……",
    )
}

pub fn checking_previous() -> Bilingual {
    Bilingual::new("Checking previous cache ...", "正在检测上个缓存……")
}

pub fn exists(backend: Backend) -> Bilingual {
    let label = escape(backend.label());
    Bilingual::new(
        format!("Cache exists（{}), your object cache system works fine.", label),
        format!("缓存获取成功（{}），您的对象缓存系统运作正常。", label),
    )
}

pub fn not_found(backend: Backend) -> Bilingual {
    let label = escape(backend.label());
    Bilingual::new(
        format!(
            "Cache not found ({}), your object cache system does NOT work fine.",
            label
        ),
        format!(
            "缓存获取失败（{}），您的对象缓存系统运作异常，请截图并联系技术支持以解决。",
            label
        ),
    )
}
