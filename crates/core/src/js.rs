//! JavaScript snippets evaluated in the target page.
//!
//! The target site exposes no stable API, so every interaction goes through
//! DOM heuristics. Each snippet returns plain JSON-serializable data; element
//! handles never cross the CDP boundary.

pub fn escape_js_string(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Injected before any page script runs. Spoofs the automation fingerprints
/// the site is known to gate on.
pub const STEALTH_INIT: &str = r#"
Object.defineProperty(navigator, 'webdriver', { get: () => false, configurable: true });
Object.defineProperty(navigator, 'plugins', {
    get: () => [{ name: 'Chrome PDF Plugin' }, { name: 'Chrome PDF Viewer' }, { name: 'Native Client' }],
    configurable: true
});
Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'], configurable: true });
window.chrome = window.chrome || { runtime: {} };
if (navigator.permissions && navigator.permissions.query) {
    const originalQuery = navigator.permissions.query.bind(navigator.permissions);
    navigator.permissions.query = (parameters) =>
        parameters && parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters);
}
"#;

/// Inspect the live page for authentication signals.
///
/// A visible login/sign-in control is a negative signal; a generate/create
/// control, a prompt-shaped placeholder, or substantial body text together
/// with recognizable navigation text are positive signals.
pub fn verification_probe_js() -> &'static str {
    r#"(() => {
        const visible = (el) => {
            const r = el.getBoundingClientRect();
            return r.width > 0 && r.height > 0;
        };
        const controls = Array.from(document.querySelectorAll('button, a')).filter(visible);
        const text = (el) => (el.textContent || '').toLowerCase();
        const hasLoginControl = controls.some(el => /(log\s?in|sign\s?in)/.test(text(el)));
        const hasGenerateControl = controls.some(el => /(generate|create)/.test(text(el)));
        const hasPromptInput = Array.from(document.querySelectorAll('textarea, input'))
            .some(el => /describe|imagine|prompt/i.test(el.getAttribute('placeholder') || ''));
        const body = document.body ? document.body.innerText : '';
        const hasNavText = /home|explore|assets|profile|library/i.test(body);
        return {
            hasLoginControl,
            hasGenerateControl,
            hasPromptInput,
            bodyTextLen: body.length,
            hasNavText
        };
    })()"#
}

/// Baseline snapshot: URLs of every currently rendered image.
pub fn image_urls_js() -> &'static str {
    r#"(() => Array.from(document.images)
        .map(img => img.currentSrc || img.src || '')
        .filter(src => src.length > 0))()"#
}

/// Locate the prompt field, write the value through the native setter, and
/// dispatch input/change so the page's reactive framework observes the edit.
/// Returns false when no usable field is present yet.
pub fn fill_prompt_js(prompt: &str) -> String {
    let escaped = escape_js_string(prompt);
    format!(
        r#"(() => {{
            const visible = (el) => {{
                const r = el.getBoundingClientRect();
                return r.width > 0 && r.height > 0;
            }};
            const fields = Array.from(
                document.querySelectorAll('textarea, input[type="text"], input:not([type])')
            ).filter(visible);
            let input = fields.find(el =>
                /describe|imagine|prompt/i.test(el.getAttribute('placeholder') || ''));
            if (!input) input = fields[0];
            if (!input) return false;
            input.focus();
            const proto = input instanceof HTMLTextAreaElement
                ? HTMLTextAreaElement.prototype
                : HTMLInputElement.prototype;
            const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
            if (descriptor && descriptor.set) {{
                descriptor.set.call(input, '{escaped}');
            }} else {{
                input.value = '{escaped}';
            }}
            input.dispatchEvent(new Event('input', {{ bubbles: true }}));
            input.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return true;
        }})()"#
    )
}

/// Click the control that displays one of the known model labels, opening the
/// model selector list.
pub fn open_model_selector_js(labels: &[&str]) -> String {
    let pattern = labels
        .iter()
        .map(|l| escape_js_string(l))
        .collect::<Vec<_>>()
        .join("|");
    format!(
        r#"(() => {{
            const visible = (el) => {{
                const r = el.getBoundingClientRect();
                return r.width > 0 && r.height > 0;
            }};
            const labels = '{pattern}'.split('|');
            const candidates = Array.from(
                document.querySelectorAll('button, [role="button"], div, span')
            ).filter(visible).filter(el => {{
                const t = (el.textContent || '').trim();
                return t.length < 40 && labels.some(l => t.includes(l));
            }});
            if (!candidates.length) return false;
            candidates.sort((a, b) =>
                (a.textContent || '').length - (b.textContent || '').length);
            candidates[0].click();
            return true;
        }})()"#
    )
}

/// Click the list option whose visible text matches the requested model.
pub fn click_model_option_js(name: &str) -> String {
    let escaped = escape_js_string(name);
    format!(
        r#"(() => {{
            const visible = (el) => {{
                const r = el.getBoundingClientRect();
                return r.width > 0 && r.height > 0;
            }};
            const options = Array.from(
                document.querySelectorAll('li, [role="option"], [role="menuitem"], div, span')
            ).filter(visible).filter(el => (el.textContent || '').includes('{escaped}'));
            if (!options.length) return false;
            options.sort((a, b) =>
                (a.textContent || '').length - (b.textContent || '').length);
            options[0].click();
            return true;
        }})()"#
    )
}

const SUBMIT_LABELLED_JS: &str = r#"(() => {
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    };
    const buttons = Array.from(document.querySelectorAll('button')).filter(visible);
    const labelled = buttons.find(b =>
        /(generate|create)/i.test((b.textContent || '').trim()));
    if (labelled) { labelled.click(); return true; }
    return false;
})()"#;

const SUBMIT_NEAR_PROMPT_JS: &str = r#"(() => {
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    };
    const buttons = Array.from(document.querySelectorAll('button')).filter(visible);
    const field = document.querySelector('textarea, input[type="text"]');
    if (!field) return false;
    const fr = field.getBoundingClientRect();
    const near = buttons.filter(b => {
        const r = b.getBoundingClientRect();
        return b.querySelector('svg, img') &&
            r.left > fr.left + fr.width / 2 &&
            Math.abs((r.top + r.height / 2) - (fr.top + fr.height / 2)) < fr.height * 1.5;
    });
    if (near.length) { near[near.length - 1].click(); return true; }
    return false;
})()"#;

const SUBMIT_COUNTER_SIBLING_JS: &str = r#"(() => {
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    };
    const buttons = Array.from(document.querySelectorAll('button')).filter(visible);
    const counter = Array.from(document.querySelectorAll('span, div')).find(el =>
        el.children.length === 0 && /^\s*\d+\s*\/\s*\d+\s*$/.test(el.textContent || ''));
    if (counter && counter.parentElement) {
        const sibling = buttons.find(b => counter.parentElement.contains(b));
        if (sibling) { sibling.click(); return true; }
    }
    return false;
})()"#;

const SUBMIT_RIGHTMOST_ICON_JS: &str = r#"(() => {
    const visible = (el) => {
        const r = el.getBoundingClientRect();
        return r.width > 0 && r.height > 0;
    };
    const buttons = Array.from(document.querySelectorAll('button')).filter(visible);
    const iconOnly = buttons.filter(b =>
        b.querySelector('svg, img') && !(b.textContent || '').trim());
    if (iconOnly.length) {
        iconOnly.sort((a, b) =>
            a.getBoundingClientRect().left - b.getBoundingClientRect().left);
        iconOnly[iconOnly.length - 1].click();
        return true;
    }
    return false;
})()"#;

/// Submit heuristics in priority order. Each snippet returns true after
/// clicking something; the orchestrator tries them in sequence, so the site
/// evolving only means editing or reordering this list.
pub fn submit_strategies() -> [(&'static str, &'static str); 4] {
    [
        ("labelled-button", SUBMIT_LABELLED_JS),
        ("icon-near-prompt", SUBMIT_NEAR_PROMPT_JS),
        ("usage-counter-sibling", SUBMIT_COUNTER_SIBLING_JS),
        ("rightmost-icon", SUBMIT_RIGHTMOST_ICON_JS),
    ]
}

/// Positions and sizes of every rendered image, in document coordinates.
pub fn scan_images_js() -> &'static str {
    r#"(() => Array.from(document.images).map(img => {
        const r = img.getBoundingClientRect();
        return {
            url: img.currentSrc || img.src || '',
            x: r.x + window.scrollX,
            y: r.y + window.scrollY,
            width: r.width,
            height: r.height
        };
    }).filter(entry => entry.url.length > 0))()"#
}

/// True while the page shows a generating/loading/percentage indicator.
pub fn generating_indicator_js() -> &'static str {
    r#"(() => {
        if (document.querySelector('[role="progressbar"], progress')) return true;
        return Array.from(document.querySelectorAll('span, div, p')).some(el => {
            if (el.children.length > 0) return false;
            const t = (el.textContent || '').trim();
            if (!t || t.length > 40) return false;
            return /generating|loading/i.test(t) || /\d{1,3}\s*%/.test(t);
        });
    })()"#
}
