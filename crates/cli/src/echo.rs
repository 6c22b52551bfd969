use owo_colors::OwoColorize;
use panelkit_core::{CacheStats, CategoryList, ChapterList, ComicDetail, ComicPage, ComicStatus, ImageList, SourceDescriptor};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Panelkit".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Browse comic sources from the terminal\n".dimmed());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn status_label(status: ComicStatus) -> String {
    match status {
        ComicStatus::Completed => status.to_string().green().to_string(),
        ComicStatus::Ongoing => status.to_string().yellow().to_string(),
    }
}

pub fn print_sources(sources: &[SourceDescriptor]) {
    for source in sources {
        let state = if source.enabled { "enabled".green().to_string() } else { "disabled".dimmed().to_string() };
        println!("{:<12} {:<12} {:<9} {}", source.id.bold(), source.name, state, source.base_url.dimmed());
    }
}

pub fn print_comic_page(page: &ComicPage) {
    if page.comics.is_empty() {
        print_warning("No comics found");
        return;
    }

    for comic in &page.comics {
        println!(
            "{:<10} {} [{}] {} {}",
            comic.id.bold(),
            comic.title.bright_white(),
            status_label(comic.status),
            comic.latest_chapter.cyan(),
            comic.update_time.dimmed()
        );
    }

    let footer = format!("{} comics", page.total);
    if page.has_more {
        eprintln!("\n{} {}", footer.dimmed(), "(more pages available)".dimmed());
    } else {
        eprintln!("\n{}", footer.dimmed());
    }
}

pub fn print_detail(detail: &ComicDetail) {
    let summary = &detail.summary;
    println!("{} {}", summary.title.bold().bright_white(), format!("#{}", summary.id).dimmed());
    println!("  {} {}", "Author:".dimmed(), detail.author);
    println!("  {} {}", "Status:".dimmed(), status_label(summary.status));
    println!("  {} {:.1}", "Rating:".dimmed(), detail.rating);
    if !detail.categories.is_empty() {
        let tags: Vec<&str> = detail.categories.iter().map(String::as_str).collect();
        println!("  {} {}", "Tags:".dimmed(), tags.join(", "));
    }
    println!("  {} {}", "Latest:".dimmed(), summary.latest_chapter);
    println!("  {} {}", "Updated:".dimmed(), summary.update_time);
    println!("  {} {}", "Cover:".dimmed(), summary.cover.underline());
    if !detail.description.is_empty() {
        println!("\n{}", detail.description);
    }
}

pub fn print_chapters(list: &ChapterList) {
    if list.chapters.is_empty() {
        print_warning("No chapters found");
        return;
    }
    for chapter in &list.chapters {
        println!(
            "{:>4}  {:<16} {} {}",
            chapter.order.to_string().dimmed(),
            chapter.id.bold(),
            chapter.title,
            chapter.update_time.dimmed()
        );
    }
}

pub fn print_images(list: &ImageList) {
    if list.images.is_empty() {
        print_warning("No images found");
        return;
    }
    for image in &list.images {
        println!("{:>4}  {}", image.page.to_string().dimmed(), image.url);
    }
}

pub fn print_categories(list: &CategoryList) {
    if list.categories.is_empty() {
        print_warning("No categories found");
        return;
    }
    for category in &list.categories {
        println!("{:<16} {} {}", category.id.bold(), category.name, category.source_url.dimmed());
    }
}

pub fn print_cache_stats(stats: &CacheStats) {
    println!("{} {}", "Entries:".dimmed(), stats.total.to_string().bright_white());
    println!("  {} {}", "Active:".dimmed(), stats.active.to_string().green());
    println!("  {} {}", "Expired:".dimmed(), stats.expired.to_string().yellow());
    println!("{} {}", "Size:".dimmed(), format_size(stats.size_bytes).bright_white());
}
