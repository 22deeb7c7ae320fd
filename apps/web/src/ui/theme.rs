//! Page stylesheet. Status, error-panel and card class names are matched by the page renderer.

pub const STYLESHEET: &str = r#"
:root { --accent: #1f6feb; --ok: #1a7f37; --bad: #cf222e; --muted: #57606a; }
* { box-sizing: border-box; }
body { font-family: system-ui, -apple-system, "Segoe UI", sans-serif; margin: 0; background: #f6f8fa; color: #24292f; }
main { max-width: 880px; margin: 0 auto; padding: 2rem 1rem 4rem; }
h1 { font-size: 1.6rem; margin: 0 0 1.25rem; }
form { background: #fff; border: 1px solid #d0d7de; border-radius: 10px; padding: 1.25rem; }
label.field { display: block; font-weight: 600; margin: 0.75rem 0 0.35rem; }
input[type="text"], input[type="number"] { width: 100%; padding: 0.55rem 0.7rem; border: 1px solid #d0d7de; border-radius: 6px; font-size: 1rem; }
.topics { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 0.35rem 0.75rem; margin-top: 0.35rem; }
.checkbox-item { display: flex; align-items: center; gap: 0.4rem; font-size: 0.92rem; }
button#run { margin-top: 1.1rem; padding: 0.6rem 1.4rem; font-size: 1rem; border: 0; border-radius: 6px; background: var(--accent); color: #fff; cursor: pointer; }
button#run:disabled { opacity: 0.55; cursor: progress; }
.status { min-height: 1.4rem; margin: 1rem 0 0.5rem; color: var(--muted); }
.status.loading { color: var(--accent); }
.status.success { color: var(--ok); }
.error-panel { display: none; margin: 1rem 0; padding: 0.8rem 1rem; border: 1px solid var(--bad); border-radius: 8px; background: #ffebe9; color: var(--bad); white-space: pre-wrap; }
.error-panel.show { display: block; }
.status-frame { display: block; width: 100%; height: 4.5rem; border: 0; margin: 0.5rem 0; }
.fragment { margin: 0; background: transparent; }
.card { background: #fff; border: 1px solid #d0d7de; border-radius: 10px; padding: 1rem 1.25rem; margin-top: 1rem; }
.card-header { font-weight: 700; font-size: 1.1rem; margin-bottom: 0.6rem; }
"#;
