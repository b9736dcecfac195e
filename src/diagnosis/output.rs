// (C) Coralbits SL 2025
// This file is part of Cacheprobe and is licensed under the
// GNU Affero General Public License v3.0.
// A commercial license on request is also available;
// contact info@coralbits.com for details.

use minijinja::{context, Environment, Value};
use reqwest::Url;

use crate::types::DiagnosisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Ok,
    Fail,
}

impl Status {
    pub fn icon(&self) -> &'static str {
        match self {
            Status::Pending => "⏳",
            Status::Ok => "✔️",
            Status::Fail => "✖️",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Status::Pending => "black",
            Status::Ok => "green",
            Status::Fail => "red",
        }
    }
}

/// A message and its Chinese translation. Both are always printed, English
/// first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bilingual {
    pub en: String,
    pub zh: String,
}

impl Bilingual {
    pub fn new(en: impl Into<String>, zh: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            zh: zh.into(),
        }
    }

    pub fn lines(&self) -> [&str; 2] {
        [self.en.as_str(), self.zh.as_str()]
    }
}

/// One status line. `message` is trusted markup.
pub fn status_line(message: &str, status: Status) -> String {
    format!(
        r#"<div style="color: {};">{} {}</div>"#,
        status.color(),
        status.icon(),
        message
    )
}

pub fn escape(text: &str) -> String {
    minijinja::HtmlEscape(text).to_string()
}

pub const PERMISSION_DENIED: &str = "Insufficient permissions | 权限不足";

const NEXT_STEP_TEMPLATE: &str = r#"<h1><a href="{{ url }}" style="color: white; background: green; text-decoration: none;">👉🏽 Next step | 下一步</a></h1>"#;

const CLOSE_TEMPLATE: &str = r#"<p><button onClick="window.open(false, '_self', false);window.close();">Done, click to close this page | 完成，点击关闭此页面</button></p>"#;

const ACTION_LINK_TEMPLATE: &str = r#"<a href="{{ admin_url }}admin-ajax.php?action={{ action }}" target="_blank" class="button button-primary" style="line-height: 1.5; height: auto; min-height: unset">Detect | 开始诊断</a>"#;

const PLUGINS_TEMPLATE: &str = r#"<table class="plugins">
{%- for plugin in plugins %}
<tr><td>{{ plugin.file }}</td><td>{% for link in plugin.actions %}{{ link|safe }}{% endfor %}</td></tr>
{%- endfor %}
</table>"#;

/// HTML fragments that are more than a status line.
pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("next_step.html", NEXT_STEP_TEMPLATE)?;
        env.add_template("close.html", CLOSE_TEMPLATE)?;
        env.add_template("action_link.html", ACTION_LINK_TEMPLATE)?;
        env.add_template("plugins.html", PLUGINS_TEMPLATE)?;
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String, DiagnosisError> {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .map_err(|e| DiagnosisError::Render {
                template: name.to_string(),
                message: e.to_string(),
            })
    }

    pub fn next_step(&self, url: &Url) -> Result<String, DiagnosisError> {
        // serialized urls percent-encode quotes and angle brackets
        let url = Value::from_safe_string(url.to_string());
        self.render("next_step.html", context! { url })
    }

    pub fn close_control(&self) -> Result<String, DiagnosisError> {
        self.render("close.html", context! {})
    }

    pub fn action_link(&self, admin_url: &Url, action: &str) -> Result<String, DiagnosisError> {
        let admin_url = Value::from_safe_string(admin_url.to_string());
        self.render("action_link.html", context! { admin_url, action })
    }

    /// `plugins` pairs each plugin file with its rendered action links.
    pub fn plugin_listing(&self, plugins: &[(String, Vec<String>)]) -> Result<String, DiagnosisError> {
        let plugins: Vec<Value> = plugins
            .iter()
            .map(|(file, actions)| context! { file, actions })
            .collect();
        self.render("plugins.html", context! { plugins })
    }
}
