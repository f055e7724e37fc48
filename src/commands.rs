// Text command surface over `FileSystem`. A line is parsed into a `Command`,
// executed, and every outcome (including failures) comes back as text.

use crate::errors::{FsError, Result};
use crate::fsystem::{FileSystem, DEFAULT_LINE_COUNT};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

const HELP: &str = "\
cd [path]                  change directory (default /)
pwd                        print the current directory
ls [-a] [-l] [path]        list a directory
tree [-a] [path]           draw a directory tree
mkdir <path>               create a directory
touch <path>               create a file or update its timestamp
rm [-r] <path>             remove a file or directory
mv <src> <dir>             move into a directory
cp <src> <dir>             copy into a directory
rename <path> <name>       rename in place
cat <file>                 print a file
write <file> <text>        overwrite a file
append <file> <text>       append a line to a file
echo <text> [> | >> file]  print or redirect text
find [path] [-name] <name> search by exact name
grep <term> <file>         print matching lines
du [path]                  disk usage
stat <path>                node metadata
wc <file>                  line, word and byte counts
head [-n N] <file>         first lines of a file
tail [-n N] <file>         last lines of a file
chmod <mode> <path>        set permissions from a 3 digit octal mode
chown <owner> <path>       change owner
zip <src> <archive>        archive a subtree into a file
unzip <archive> [dest]     restore an archive
whoami                     print the acting user
su <user>                  switch the acting user
clear                      clear the screen
exit                       leave";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
    pub text: String,
    pub exit: bool,
}

impl CommandOutput {
    fn text(text: impl Into<String>) -> Self {
        CommandOutput {
            text: text.into(),
            exit: false,
        }
    }

    fn empty() -> Self {
        CommandOutput::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Cd(Option<String>),
    Pwd,
    Ls {
        path: Option<String>,
        all: bool,
        long: bool,
    },
    Tree {
        path: Option<String>,
        all: bool,
    },
    Mkdir(String),
    Touch(String),
    Rm {
        path: String,
        recursive: bool,
    },
    Mv(String, String),
    Cp(String, String),
    Rename(String, String),
    Cat(String),
    Write {
        path: String,
        text: String,
        append: bool,
    },
    Echo(String),
    Find {
        path: Option<String>,
        name: String,
    },
    Grep(String, String),
    Du(Option<String>),
    Stat(String),
    Wc(String),
    Head(String, usize),
    Tail(String, usize),
    Chmod(String, String),
    Chown(String, String),
    Zip(String, String),
    Unzip(String, Option<String>),
    Whoami,
    Su(String),
    Clear,
    Exit,
    Help,
    Unknown(String),
}

fn one(args: &[&str]) -> Result<String> {
    match args {
        [arg] => Ok(arg.to_string()),
        [] => Err(FsError::invalid_argument("missing operand")),
        _ => Err(FsError::invalid_argument("too many arguments")),
    }
}

fn two(args: &[&str]) -> Result<(String, String)> {
    match args {
        [first, second] => Ok((first.to_string(), second.to_string())),
        [] | [_] => Err(FsError::invalid_argument("missing operand")),
        _ => Err(FsError::invalid_argument("too many arguments")),
    }
}

fn optional(args: &[&str]) -> Result<Option<String>> {
    match args {
        [] => Ok(None),
        [arg] => Ok(Some(arg.to_string())),
        _ => Err(FsError::invalid_argument("too many arguments")),
    }
}

/// Split leading `-x` style flags from the operands.
fn flags<'a>(args: &[&'a str]) -> (Vec<char>, Vec<&'a str>) {
    let mut found = Vec::new();
    let mut rest = Vec::new();
    for arg in args {
        match arg.strip_prefix('-') {
            Some(letters) if !letters.is_empty() && rest.is_empty() => {
                found.extend(letters.chars())
            }
            _ => rest.push(*arg),
        }
    }
    (found, rest)
}

fn reject_unknown(found: &[char], allowed: &[char]) -> Result<()> {
    match found.iter().find(|c| !allowed.contains(c)) {
        Some(c) => Err(FsError::invalid_argument(format!("invalid option -- '{}'", c))),
        None => Ok(()),
    }
}

fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

fn line_count(args: &[&str]) -> Result<(usize, String)> {
    match args {
        ["-n", count, path] => {
            let count = count.parse::<usize>().map_err(|_| {
                FsError::invalid_argument(format!("invalid number of lines: '{}'", count))
            })?;
            Ok((count, path.to_string()))
        }
        _ => Ok((DEFAULT_LINE_COUNT, one(args)?)),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Command> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (verb, args) = match tokens.split_first() {
            Some((verb, args)) => (*verb, args),
            None => return Err(FsError::invalid_argument("empty command")),
        };
        let cmd = match verb {
            "cd" => Command::Cd(optional(args)?),
            "pwd" => Command::Pwd,
            "ls" => {
                let (found, rest) = flags(args);
                reject_unknown(&found, &['a', 'l'])?;
                Command::Ls {
                    path: optional(&rest)?,
                    all: found.contains(&'a'),
                    long: found.contains(&'l'),
                }
            }
            "tree" => {
                let (found, rest) = flags(args);
                reject_unknown(&found, &['a'])?;
                Command::Tree {
                    path: optional(&rest)?,
                    all: found.contains(&'a'),
                }
            }
            "mkdir" => Command::Mkdir(one(args)?),
            "touch" => Command::Touch(one(args)?),
            "rm" => {
                let (found, rest) = flags(args);
                reject_unknown(&found, &['r', 'f'])?;
                Command::Rm {
                    path: one(&rest)?,
                    recursive: found.contains(&'r'),
                }
            }
            "mv" => {
                let (src, dest) = two(args)?;
                Command::Mv(src, dest)
            }
            "cp" => {
                let (src, dest) = two(args)?;
                Command::Cp(src, dest)
            }
            "rename" => {
                let (path, name) = two(args)?;
                Command::Rename(path, name)
            }
            "cat" => Command::Cat(one(args)?),
            "write" | "append" => match args.split_first() {
                Some((path, text)) if !text.is_empty() => Command::Write {
                    path: path.to_string(),
                    text: unquote(&text.join(" ")),
                    append: verb == "append",
                },
                _ => return Err(FsError::invalid_argument("missing operand")),
            },
            "echo" => match args.iter().position(|a| *a == ">" || *a == ">>") {
                Some(at) => Command::Write {
                    path: one(&args[at + 1..])?,
                    text: unquote(&args[..at].join(" ")),
                    append: args[at] == ">>",
                },
                None => Command::Echo(unquote(&args.join(" "))),
            },
            "find" => {
                let rest: Vec<&str> = args
                    .iter()
                    .copied()
                    .filter(|a| *a != "-name")
                    .collect();
                match rest.as_slice() {
                    [name] => Command::Find {
                        path: None,
                        name: name.to_string(),
                    },
                    [path, name] => Command::Find {
                        path: Some(path.to_string()),
                        name: name.to_string(),
                    },
                    [] => return Err(FsError::invalid_argument("missing operand")),
                    _ => return Err(FsError::invalid_argument("too many arguments")),
                }
            }
            "grep" => {
                let (term, path) = two(args)?;
                Command::Grep(term, path)
            }
            "du" => Command::Du(optional(args)?),
            "stat" => Command::Stat(one(args)?),
            "wc" => Command::Wc(one(args)?),
            "head" => {
                let (count, path) = line_count(args)?;
                Command::Head(path, count)
            }
            "tail" => {
                let (count, path) = line_count(args)?;
                Command::Tail(path, count)
            }
            "chmod" => {
                let (mode, path) = two(args)?;
                Command::Chmod(mode, path)
            }
            "chown" => {
                let (owner, path) = two(args)?;
                Command::Chown(owner, path)
            }
            "zip" => {
                let (src, archive) = two(args)?;
                Command::Zip(src, archive)
            }
            "unzip" => match args {
                [archive] => Command::Unzip(archive.to_string(), None),
                [archive, dest] => {
                    Command::Unzip(archive.to_string(), Some(dest.to_string()))
                }
                [] => return Err(FsError::invalid_argument("missing operand")),
                _ => return Err(FsError::invalid_argument("too many arguments")),
            },
            "whoami" => Command::Whoami,
            "su" => Command::Su(one(args)?),
            "clear" => Command::Clear,
            "exit" | "quit" => Command::Exit,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        };
        Ok(cmd)
    }

    pub fn execute(self, fs: &mut FileSystem) -> Result<CommandOutput> {
        let output = match self {
            Command::Cd(path) => {
                fs.cd(path.as_deref())?;
                CommandOutput::empty()
            }
            Command::Pwd => CommandOutput::text(fs.pwd()),
            Command::Ls { path, all, long } => {
                CommandOutput::text(fs.ls(path.as_deref(), all, long)?)
            }
            Command::Tree { path, all } => {
                CommandOutput::text(fs.tree(path.as_deref(), all)?)
            }
            Command::Mkdir(path) => {
                fs.mkdir(&path)?;
                CommandOutput::empty()
            }
            Command::Touch(path) => {
                fs.touch(&path)?;
                CommandOutput::empty()
            }
            Command::Rm { path, recursive } => {
                fs.rm(&path, recursive)?;
                CommandOutput::empty()
            }
            Command::Mv(src, dest) => {
                fs.mv(&src, &dest)?;
                CommandOutput::empty()
            }
            Command::Cp(src, dest) => {
                fs.cp(&src, &dest)?;
                CommandOutput::empty()
            }
            Command::Rename(path, name) => {
                fs.rename(&path, &name)?;
                CommandOutput::empty()
            }
            Command::Cat(path) => CommandOutput::text(fs.cat(&path)?),
            Command::Write { path, text, append } => {
                fs.write(&path, &text, append)?;
                CommandOutput::empty()
            }
            Command::Echo(text) => CommandOutput::text(text),
            Command::Find { path, name } => {
                CommandOutput::text(fs.find(path.as_deref(), &name)?)
            }
            Command::Grep(term, path) => CommandOutput::text(fs.grep(&term, &path)?),
            Command::Du(path) => CommandOutput::text(fs.du(path.as_deref())?),
            Command::Stat(path) => CommandOutput::text(fs.stat(&path)?.to_string()),
            Command::Wc(path) => CommandOutput::text(fs.wc(&path)?.to_string()),
            Command::Head(path, count) => CommandOutput::text(fs.head(&path, count)?),
            Command::Tail(path, count) => CommandOutput::text(fs.tail(&path, count)?),
            Command::Chmod(mode, path) => {
                fs.chmod(&mode, &path)?;
                CommandOutput::empty()
            }
            Command::Chown(owner, path) => {
                fs.chown(&owner, &path)?;
                CommandOutput::empty()
            }
            Command::Zip(src, archive) => CommandOutput::text(fs.zip(&src, &archive)?),
            Command::Unzip(archive, dest) => {
                CommandOutput::text(fs.unzip(&archive, dest.as_deref())?)
            }
            Command::Whoami => CommandOutput::text(fs.whoami()),
            Command::Su(user) => {
                fs.su(&user)?;
                CommandOutput::empty()
            }
            Command::Clear => CommandOutput::text(CLEAR_SCREEN),
            Command::Exit => CommandOutput {
                text: String::new(),
                exit: true,
            },
            Command::Help => CommandOutput::text(HELP),
            Command::Unknown(verb) => {
                CommandOutput::text(format!("{}: command not found", verb))
            }
        };
        Ok(output)
    }
}

/// Parse and execute one line. Failures are rendered as `verb: message`.
pub fn run(fs: &mut FileSystem, line: &str) -> CommandOutput {
    let line = line.trim();
    let verb = match line.split_whitespace().next() {
        Some(verb) => verb,
        None => return CommandOutput::empty(),
    };
    match Command::parse(line).and_then(|cmd| cmd.execute(fs)) {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("Command {} failed: {}", verb, e);
            CommandOutput::text(format!("{}: {}", verb, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_operands() {
        assert_eq!(
            Command::parse("ls -la /a").unwrap(),
            Command::Ls {
                path: Some("/a".to_string()),
                all: true,
                long: true
            }
        );
        assert_eq!(
            Command::parse("rm -r d").unwrap(),
            Command::Rm {
                path: "d".to_string(),
                recursive: true
            }
        );
        assert_eq!(
            Command::parse("head -n 3 f").unwrap(),
            Command::Head("f".to_string(), 3)
        );
        assert_eq!(
            Command::parse("tail f").unwrap(),
            Command::Tail("f".to_string(), DEFAULT_LINE_COUNT)
        );
        assert_eq!(
            Command::parse("find / -name x").unwrap(),
            Command::Find {
                path: Some("/".to_string()),
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn echo_redirects() {
        assert_eq!(
            Command::parse("echo \"hello world\" >> notes").unwrap(),
            Command::Write {
                path: "notes".to_string(),
                text: "hello world".to_string(),
                append: true
            }
        );
        assert_eq!(
            Command::parse("echo hi there").unwrap(),
            Command::Echo("hi there".to_string())
        );
    }

    #[test]
    fn bad_arguments() {
        let err = Command::parse("rm").unwrap_err();
        assert_eq!(err.message, "missing operand");
        assert!(Command::parse("ls -z").is_err());
        assert!(Command::parse("head -n x f").is_err());
    }

    #[test]
    fn failures_become_text() {
        let mut fs = FileSystem::new("user");
        let out = run(&mut fs, "mkdir /home/user");
        assert_eq!(out.text, "mkdir: 'home': No such file or directory");
        assert!(!out.exit);
        assert_eq!(run(&mut fs, "rm").text, "rm: missing operand: Invalid argument");
        assert_eq!(run(&mut fs, "frobnicate x").text, "frobnicate: command not found");
        assert_eq!(run(&mut fs, "   ").text, "");
    }

    #[test]
    fn session_flow() {
        let mut fs = FileSystem::new("user");
        run(&mut fs, "mkdir docs");
        run(&mut fs, "cd docs");
        assert_eq!(run(&mut fs, "pwd").text, "/docs");
        run(&mut fs, "echo first > notes");
        run(&mut fs, "append notes second line");
        assert_eq!(run(&mut fs, "cat notes").text, "first\nsecond line");
        assert_eq!(run(&mut fs, "whoami").text, "user");
        assert!(run(&mut fs, "exit").exit);
    }
}
