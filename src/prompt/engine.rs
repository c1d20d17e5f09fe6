use tera::Tera;

/// Tera registry holding the persona and request templates.
///
/// Templates are registered without a file extension, so Tera never applies
/// HTML autoescaping to Reddit text.
pub struct TeraEngine {
    tera: Tera,
}

impl TeraEngine {
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
        }
    }

    /// Register (or replace) a template, compiling it immediately.
    pub fn add_template(&mut self, name: &str, content: &str) -> anyhow::Result<()> {
        self.tera.add_raw_template(name, content)?;
        Ok(())
    }

    pub fn render(&self, template_name: &str, context: &tera::Context) -> anyhow::Result<String> {
        let rendered = self.tera.render(template_name, context)?;
        Ok(rendered)
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}
