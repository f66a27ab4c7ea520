fn main() {
    walltext::start_walltext();
}
