use std::{env, fs, path::PathBuf};

fn paging(cmd: clap::Command) -> clap::Command {
    cmd.arg(clap::arg!(--page <NUM> "Page number, starting at 1").default_value("1"))
        .arg(clap::arg!(--limit <NUM> "Comics per page").default_value("20"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("panelkit")
        .version("0.1.0")
        .author("Panelkit Contributors")
        .about("Browse comic sources from the terminal")
        .arg(clap::arg!(-s --source <ID> "Source id (default: mangahaven)").global(true))
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (text, json)")
                .value_name("FORMAT")
                .default_value("text")
                .value_parser(["text", "json"])
                .global(true),
        )
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("15").global(true))
        .arg(clap::arg!(--"user-agent" <UA> "Custom User-Agent for HTTP requests").value_name("UA").global(true))
        .arg(clap::arg!(--proxy <URL> "Proxy for this run, e.g. socks5://127.0.0.1:1080").global(true))
        .arg(
            clap::arg!(--store <FILE> "Store file for the cache and proxy settings")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .arg(clap::arg!(-v --verbose "Enable debug logging").global(true))
        .subcommand(
            clap::Command::new("sources")
                .about("List sources")
                .arg(clap::arg!(--all "Include disabled sources")),
        )
        .subcommand(paging(clap::Command::new("hot").about("Popular comics")))
        .subcommand(paging(clap::Command::new("latest").about("Recently updated comics")))
        .subcommand(paging(
            clap::Command::new("category")
                .about("Comics in one category, or in all of them")
                .arg(clap::arg!(--id <ID> "Category id from the `categories` command")),
        ))
        .subcommand(paging(
            clap::Command::new("search")
                .about("Search by keyword")
                .arg(clap::arg!(<KEYWORD> "Search keyword")),
        ))
        .subcommand(clap::Command::new("detail").about("Comic details").arg(clap::arg!(<COMIC_ID> "Comic id")))
        .subcommand(
            clap::Command::new("chapters")
                .about("Chapter list of a comic")
                .arg(clap::arg!(<COMIC_ID> "Comic id")),
        )
        .subcommand(
            clap::Command::new("images")
                .about("Page images of a chapter")
                .arg(clap::arg!(<CHAPTER_ID> "Chapter id")),
        )
        .subcommand(clap::Command::new("categories").about("Categories offered by a source"))
        .subcommand(
            clap::Command::new("cache")
                .about("Inspect or clear the result cache")
                .subcommand(clap::Command::new("stats").about("Entry counts and size"))
                .subcommand(clap::Command::new("clear").about("Remove every cached result"))
                .subcommand(clap::Command::new("clear-expired").about("Remove expired results only")),
        );

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "panelkit", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "panelkit", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "panelkit", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "panelkit", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
