mod script;

use anyhow::{Context, Result, bail};
use blockweave_config::{Config, IdScheme};
use blockweave_engine::model::{SequentialIdGenerator, UuidIdGenerator};
use blockweave_engine::{
    ActionLog, BlockRenderer, CursorState, DocumentBuilder, DocumentTree, Editor, FormatFlags, Key,
    KeyOutcome,
};
use script::{Command, parse_script};
use std::{
    env,
    path::{Path, PathBuf},
    process,
};

/// Build the starting document from the leading `block` commands
fn initial_document(commands: &[Command]) -> Result<(DocumentTree, usize)> {
    let mut builder = DocumentBuilder::new("doc");
    let mut count = 0;
    for command in commands {
        let Command::Block(text) = command else {
            break;
        };
        count += 1;
        let span = format!("s{count}");
        builder = builder.block(format!("b{count}"), [(span.as_str(), text.as_str(), FormatFlags::empty())]);
    }
    Ok((builder.build()?, count))
}

fn new_editor(tree: DocumentTree, config: &Config) -> Editor {
    let editor = Editor::new(tree).with_renderer(BlockRenderer::new(config.class_prefix.clone()));
    match config.id_scheme {
        IdScheme::Uuid => editor.with_id_generator(UuidIdGenerator),
        IdScheme::Sequential => editor.with_id_generator(SequentialIdGenerator::new("n")),
    }
}

/// Replay `source` against a fresh editor, printing dumps to `out`
fn run_script(source: &str, config: &Config, out: &mut String) -> Result<Editor> {
    let commands = parse_script(source)?;
    let (tree, setup) = initial_document(&commands)?;
    let mut editor = new_editor(tree, config);
    editor.render();

    for command in &commands[setup..] {
        log::debug!("running {command:?}");
        match command {
            Command::Block(_) => bail!("block commands must come before any edit"),
            Command::Caret { span, offset } => {
                editor.set_cursor_state(CursorState::collapsed(span.as_str(), *offset));
            }
            Command::Select {
                start,
                start_offset,
                end,
                end_offset,
            } => {
                editor.set_cursor_state(CursorState::open(
                    start.as_str(),
                    *start_offset,
                    end.as_str(),
                    *end_offset,
                ));
            }
            Command::Type(text) => {
                if editor.surface_mut().type_text(text) {
                    editor.input()?;
                } else {
                    log::warn!("no caret to type {text:?} at");
                }
            }
            Command::Compose(text) => {
                editor.composition_start();
                editor.surface_mut().type_text(text);
                editor.input()?;
                editor.composition_end()?;
            }
            Command::Key(name) => {
                let key = Key::from_name(name);
                if editor.key_down(&key)? == KeyOutcome::Default {
                    surface_default(&mut editor, &key)?;
                }
            }
            Command::Paste => {
                let outcome = editor.paste();
                log::info!("paste: {outcome:?}");
            }
            Command::Dump => dump(&editor, out),
        }
    }
    dump(&editor, out);
    Ok(editor)
}

/// What the surface does on its own for keys the editor let through
fn surface_default(editor: &mut Editor, key: &Key) -> Result<()> {
    let changed = match key {
        Key::Character(c) => editor.surface_mut().type_text(c.encode_utf8(&mut [0; 4])),
        Key::Backspace => editor.surface_mut().delete_backward(),
        _ => false,
    };
    if changed {
        editor.input()?;
    }
    Ok(())
}

fn dump(editor: &Editor, out: &mut String) {
    out.push_str("--- tree\n");
    out.push_str(&editor.tree().dump());
    out.push_str("--- surface\n");
    out.push_str(&editor.surface().dump());
    out.push_str(&format!("--- cursor {:?}\n", editor.tree().cursor_state()));
}

fn write_action_log(log: &ActionLog, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(log)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <script> [action-log-path]", args[0]);
        process::exit(1);
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let source = std::fs::read_to_string(&args[1]).with_context(|| format!("reading {}", args[1]))?;
    let mut out = String::new();
    let editor = run_script(&source, &config, &mut out)?;
    print!("{out}");

    let log_path = args.get(2).map(PathBuf::from).or(config.action_log_path);
    if let Some(path) = log_path {
        write_action_log(editor.action_log(), &path)?;
        log::info!("wrote {} batches to {}", editor.action_log().len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sequential() -> Config {
        Config {
            id_scheme: IdScheme::Sequential,
            ..Config::default()
        }
    }

    fn block_texts(editor: &Editor) -> Vec<String> {
        let tree = editor.tree();
        tree.children(tree.root())
            .map(|block| tree.text_of(block.id()))
            .collect()
    }

    #[test]
    fn test_script_edits_document() {
        let script = "\
block hello world
block second
caret s1 5
type ,
enter
key x
caret s2 0
backspace
";
        let mut out = String::new();
        let editor = run_script(script, &sequential(), &mut out).unwrap();

        assert_eq!(block_texts(&editor), vec!["hello,", "x worldsecond"]);
        assert!(out.contains("--- surface"));
        editor.tree().check_invariants().unwrap();
    }

    #[test]
    fn test_backspace_inside_span_uses_surface_default() {
        let mut out = String::new();
        let editor = run_script("block abc\ncaret s1 2\nbackspace\n", &sequential(), &mut out).unwrap();

        assert_eq!(block_texts(&editor), vec!["ac"]);
        assert_eq!(editor.tree().cursor_state(), &CursorState::collapsed("s1", 1));
    }

    #[test]
    fn test_block_after_edit_is_rejected() {
        let mut out = String::new();
        let result = run_script("block a\ncaret s1 0\nblock b\n", &sequential(), &mut out);

        assert!(result.is_err());
    }

    #[test]
    fn test_class_prefix_reaches_renderer() {
        let config = Config {
            class_prefix: "bw".to_string(),
            ..sequential()
        };
        let mut out = String::new();
        run_script("block a\n", &config, &mut out).unwrap();

        assert!(out.contains("div.bw-editor <doc>"));
    }

    #[test]
    fn test_action_log_written_as_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/actions.toml");
        let mut out = String::new();
        let editor = run_script("block ab\ncaret s1 1\nenter\ncompose c\n", &sequential(), &mut out).unwrap();

        write_action_log(editor.action_log(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let read_back: ActionLog = toml::from_str(&content).unwrap();
        assert_eq!(read_back.len(), 2);
        let kinds: Vec<&str> = read_back.batches()[0].actions.iter().map(|a| a.kind()).collect();
        assert_eq!(kinds, vec!["new-block", "update-span"]);

        let mut replica = initial_document(&parse_script("block ab").unwrap()).unwrap().0;
        for batch in read_back.batches() {
            replica.apply_actions(&batch.actions).unwrap();
        }
        assert_eq!(replica.dump(), editor.tree().dump());
    }
}
