//! End-to-end bundling tests
//!
//! Each test builds a small asset tree in memory (or on disk), bundles
//! an entry and checks the composed output and the recorded graph.

use serde_json::json;
use spacey_bundler::{Bundler, Hooks, MemoryFileSystem, ModuleId, Options, OsFileSystem, Severity};
use std::path::Path;

fn options(value: serde_json::Value) -> Options {
    serde_json::from_value(value).expect("options")
}

fn module_id(bundler: &Bundler, path: &str) -> ModuleId {
    bundler
        .modules()
        .iter()
        .position(|m| m.file.path() == Path::new(path))
        .map(ModuleId)
        .expect("module loaded")
}

#[test]
fn test_commonjs_chain_tpack() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.js", "require(\"./b\")");
    fs.add("/www/b.js", "module.exports = 1");

    let mut bundler = Bundler::new(Options::default(), fs);
    let entry = bundler.get_module(Path::new("/www/a.js")).unwrap();
    let out = bundler.save(entry);
    assert_eq!(out.len(), 1);
    let text = &out[0].text;

    // loader preamble first
    assert!(text.starts_with("var __tpack__"));
    // the callee is defined by its re-based name, before the caller
    let define_b =
        "__tpack__.define(\"./b.js\", function(require, exports, module){\n\tmodule.exports = 1\n});";
    let define_a =
        "__tpack__.define(function(require, exports, module){\n\trequire(\"./b.js\")\n});";
    assert!(text.contains(define_b), "missing b define in:\n{text}");
    assert!(text.contains(define_a), "missing a define in:\n{text}");
    assert!(text.find(define_b).unwrap() < text.find(define_a).unwrap());
}

#[test]
fn test_circular_include_refused() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.html", "<!-- #include \"b.html\" -->");
    fs.add("/www/b.html", "<!-- #include \"a.html\" -->");

    let mut bundler = Bundler::new(Options::default(), fs);
    let a = bundler.get_module(Path::new("/www/a.html")).unwrap();
    let b = module_id(&bundler, "/www/b.html");

    assert_eq!(bundler.module(a).includes, vec![b]);
    assert!(bundler.module(b).includes.is_empty());

    let reports = bundler.reports(b);
    assert!(reports
        .iter()
        .any(|r| r.severity == Severity::Warning
            && r.message.contains("Circular include with 'a.html'")));
}

#[test]
fn test_inline_threshold() {
    let mut png = vec![0x89u8, b'P', b'N', b'G'];
    png.extend(std::iter::repeat(0u8).take(46));
    assert_eq!(png.len(), 50);

    let mut fs = MemoryFileSystem::new();
    fs.add("/www/page.html", "<img src=\"icon.png\">");
    fs.add_bytes("/www/icon.png", png);

    let mut bundler = Bundler::new(options(json!({"url": {"inline": 100}})), fs);
    let page = bundler.get_module(Path::new("/www/page.html")).unwrap();
    let icon = module_id(&bundler, "/www/icon.png");

    assert!(bundler.module(page).includes.contains(&icon));
    let out = bundler.save(page);
    assert!(
        out[0].text.contains("<img src=\"data:image/png;base64,"),
        "no data URL in:\n{}",
        out[0].text
    );
}

#[test]
fn test_inline_threshold_exceeded_rewrites_link() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/pages/page.html", "<img src=\"../img/icon.png\">");
    fs.add_bytes("/www/img/icon.png", vec![0x89; 200]);

    let mut bundler = Bundler::new(options(json!({"url": {"inline": 100}})), fs);
    let page = bundler.get_module(Path::new("/www/pages/page.html")).unwrap();
    let out = bundler.save(page);
    assert!(out[0].text.contains("<img src=\"../img/icon.png\">"));
    assert!(bundler.module(page).includes.is_empty());
}

#[test]
fn test_preprocessor_if_else() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/main.js",
        "/* #if DEBUG */console.log(1);/* #else */console.log(2);/* #endif */",
    );

    let mut bundler = Bundler::new(options(json!({"define": {"DEBUG": false}})), fs);
    let main = bundler.get_module(Path::new("/www/main.js")).unwrap();
    let out = bundler.save(main);
    assert_eq!(out[0].text, "console.log(2);");
}

#[test]
fn test_preprocessor_if_zero_is_hidden() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/main.js", "a();/* #if 0 */gone();/* #endif */b();");

    let mut bundler = Bundler::new(Options::default(), fs);
    let main = bundler.get_module(Path::new("/www/main.js")).unwrap();
    let out = bundler.save(main);
    assert_eq!(out[0].text, "a();b();");
}

#[test]
fn test_alias_and_query_preserved() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.js", "require(\"~/x?v=1\")");
    fs.add("/www/src/x.js", "exports.x = 1");

    let mut bundler = Bundler::new(options(json!({"resolve": {"alias": {"~": "src"}}})), fs);
    let a = bundler.get_module(Path::new("/www/a.js")).unwrap();
    let x = module_id(&bundler, "/www/src/x.js");
    assert!(bundler.module(a).requires.contains(&x));

    let out = bundler.save(a);
    assert!(
        out[0].text.contains("require(\"./src/x.js?v=1\")"),
        "rewritten require missing in:\n{}",
        out[0].text
    );
}

#[test]
fn test_externals_propagate() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/a.js",
        "/* #external \"./b.js\" */\nrequire(\"./b\");",
    );
    fs.add("/www/b.js", "require(\"./c\");");
    fs.add("/www/c.js", "exports.x = 1;");

    let mut bundler = Bundler::new(Options::default(), fs);
    let a = bundler.get_module(Path::new("/www/a.js")).unwrap();
    let b = module_id(&bundler, "/www/b.js");
    let c = module_id(&bundler, "/www/c.js");

    // c is excluded because the excluded b transitively requires it
    assert_eq!(bundler.all_externals(a), vec![b, c]);
    assert_eq!(bundler.all_requires(a), vec![a]);
}

#[test]
fn test_graph_invariants_after_load() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/app.js",
        "require(\"./a\");require(\"./b\");require(\"./a\");",
    );
    fs.add("/www/a.js", "require(\"./b\");");
    fs.add("/www/b.js", "require(\"./app\");"); // require cycle

    let mut bundler = Bundler::new(Options::default(), fs);
    let app = bundler.get_module(Path::new("/www/app.js")).unwrap();

    for (index, m) in bundler.modules().iter().enumerate() {
        let id = ModuleId(index);
        assert!(!m.requires.contains(&id), "self-require recorded");
        assert!(!m.externals.contains(&id), "self-external recorded");
        for pair in m.replacements.items().windows(2) {
            assert!(pair[0].end <= pair[1].start, "replacements overlap");
        }
    }

    let order = bundler.all_requires(app);
    assert_eq!(order.last(), Some(&app), "self must come last");
    let mut dedup = order.clone();
    dedup.sort();
    dedup.dedup();
    assert_eq!(dedup.len(), order.len(), "closure must not repeat modules");
}

#[test]
fn test_pass_through_module_is_identity() {
    let content = "plain text\nwith two lines\n";
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/notes.txt", content);

    let mut bundler = Bundler::new(Options::default(), fs);
    let id = bundler.get_module(Path::new("/www/notes.txt")).unwrap();
    let out = bundler.save(id);
    assert_eq!(out[0].text, content);
}

#[test]
fn test_skip_attribute_suppresses_tag() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/page.html", "<img __skip src=\"missing.png\">");

    let mut bundler = Bundler::new(Options::default(), fs);
    let page = bundler.get_module(Path::new("/www/page.html")).unwrap();
    assert!(bundler.reports(page).is_empty());
    let out = bundler.save(page);
    assert_eq!(out[0].text, "<img src=\"missing.png\">");
}

#[test]
fn test_inline_script_becomes_synthetic_module() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/page.html",
        "<p>x</p><script>var u = __url(\"logo.png\");</script>",
    );
    fs.add_bytes("/www/logo.png", vec![0x89; 10]);

    let mut bundler = Bundler::new(options(json!({"url": {"inline": 100}})), fs);
    let page = bundler.get_module(Path::new("/www/page.html")).unwrap();

    let synthetic = module_id(&bundler, "/www/page.html#inline0.js");
    assert!(bundler.module(page).includes.contains(&synthetic));

    let out = bundler.save(page);
    assert!(out[0].text.contains("<script>var u = \"data:image/png;base64,"));
    assert!(out[0].text.ends_with("</script>"));
}

#[test]
fn test_absolute_require_probes_literal_path() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.js", "require(\"/lib/x\")");
    fs.add("/lib/x.js", "exports.x = 1");

    let mut bundler = Bundler::new(Options::default(), fs);
    let a = bundler.get_module(Path::new("/www/a.js")).unwrap();
    assert!(bundler.reports(a).is_empty());

    let x = module_id(&bundler, "/lib/x.js");
    assert!(bundler.module(a).requires.contains(&x));

    let out = bundler.save(a);
    assert!(
        out[0].text.contains("require(\"../lib/x.js\")"),
        "rewritten require missing in:\n{}",
        out[0].text
    );
}

#[test]
fn test_css_import_function_hook_splices_replacement() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/site.css", "@import \"base.css\";\nbody { color: red; }");

    let hooks = Hooks {
        css_import: Some(Box::new(|url, _| Some(format!("/* dropped {url} */")))),
        ..Hooks::default()
    };
    let mut bundler =
        Bundler::new(options(json!({"css": {"import": "function"}})), fs).with_hooks(hooks);
    let site = bundler.get_module(Path::new("/www/site.css")).unwrap();

    let out = bundler.save(site);
    assert_eq!(out[0].text, "/* dropped base.css */\nbody { color: red; }");
    // the hook replaces the statement; no edge is recorded
    assert!(bundler.module(site).requires.is_empty());
}

#[test]
fn test_css_import_inline_pulls_sheet_into_closure() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/site.css", "@import url(\"base.css\");\nbody { color: red; }");
    fs.add("/www/base.css", "html { margin: 0; }");

    let mut bundler = Bundler::new(Options::default(), fs);
    let site = bundler.get_module(Path::new("/www/site.css")).unwrap();
    let base = module_id(&bundler, "/www/base.css");
    assert!(bundler.module(site).requires.contains(&base));

    let out = bundler.save(site);
    assert!(out[0].text.contains("html { margin: 0; }"));
    assert!(!out[0].text.contains("@import"));
}

#[test]
fn test_unresolved_require_reports_error() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.js", "require(\"./missing\")");

    let mut bundler = Bundler::new(Options::default(), fs);
    let a = bundler.get_module(Path::new("/www/a.js")).unwrap();
    let reports = bundler.reports(a);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Error);
    assert!(reports[0].message.contains("Cannot find module './missing'"));
}

#[test]
fn test_unresolved_inline_reference_is_warning() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/page.html", "<img src=\"missing.png\">");

    let mut bundler = Bundler::new(Options::default(), fs);
    let page = bundler.get_module(Path::new("/www/page.html")).unwrap();
    let reports = bundler.reports(page);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::Warning);
}

#[test]
fn test_source_map_emitted_when_enabled() {
    let mut fs = MemoryFileSystem::new();
    fs.add("/www/a.js", "require(\"./b\")");
    fs.add("/www/b.js", "module.exports = 1");

    let mut bundler = Bundler::new(options(json!({"output": {"sourceMap": true}})), fs);
    let a = bundler.get_module(Path::new("/www/a.js")).unwrap();
    let out = bundler.save(a);
    let map = out[0].source_map.as_ref().expect("source map");
    let map: serde_json::Value = serde_json::from_str(map).unwrap();
    assert_eq!(map["version"], 3);
    let sources: Vec<String> = map["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    assert!(sources.iter().any(|s| s.ends_with("a.js")));
    assert!(sources.iter().any(|s| s.ends_with("b.js")));
}

#[test]
fn test_node_modules_package_lookup_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("node_modules/greet")).unwrap();
    std::fs::write(
        root.join("node_modules/greet/package.json"),
        r#"{"main": "lib/index.js"}"#,
    )
    .unwrap();
    std::fs::create_dir_all(root.join("node_modules/greet/lib")).unwrap();
    std::fs::write(
        root.join("node_modules/greet/lib/index.js"),
        "exports.hi = 1;",
    )
    .unwrap();
    std::fs::write(root.join("app.js"), "require(\"greet\")").unwrap();

    let mut bundler = Bundler::new(Options::default(), OsFileSystem);
    let app = bundler.get_module(&root.join("app.js")).unwrap();
    assert!(bundler.reports(app).is_empty());

    let greet = bundler.module(app).requires[0];
    assert!(bundler
        .module(greet)
        .file
        .path()
        .ends_with("node_modules/greet/lib/index.js"));

    let out = bundler.save(app);
    assert!(out[0]
        .text
        .contains("__tpack__.define(\"./node_modules/greet/lib/index.js\""));
}

#[test]
fn test_region_switched_off() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/main.js",
        "keep();/* #region debug */trace();/* #endregion */done();",
    );

    let mut bundler = Bundler::new(options(json!({"region": {"debug": false}})), fs);
    let main = bundler.get_module(Path::new("/www/main.js")).unwrap();
    let out = bundler.save(main);
    assert_eq!(out[0].text, "keep();done();");
}

#[test]
fn test_extract_css_redirects_style_requires() {
    let mut fs = MemoryFileSystem::new();
    fs.add(
        "/www/app.js",
        "// #extract-css\nrequire(\"./theme.css\");\nrequire(\"./util\");",
    );
    fs.add("/www/theme.css", "body { color: red; }");
    fs.add("/www/util.js", "exports.u = 1;");

    let mut bundler = Bundler::new(Options::default(), fs);
    let app = bundler.get_module(Path::new("/www/app.js")).unwrap();
    let theme = module_id(&bundler, "/www/theme.css");
    let util = module_id(&bundler, "/www/util.js");

    let sibling = bundler.module(app).extract_css.expect("extract sibling");
    assert!(bundler.module(sibling).requires.contains(&theme));
    assert!(bundler.module(app).requires.contains(&util));
    assert!(!bundler.module(app).requires.contains(&theme));

    let outputs = bundler.save(app);
    assert_eq!(outputs.len(), 2);
    // the require("./theme.css") call is deleted from the script bundle
    assert!(!outputs[0].text.contains("theme.css"));
    // the sibling stylesheet carries the extracted rules
    assert!(outputs[1].text.contains("body { color: red; }"));
}
