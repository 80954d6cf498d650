fn main() {
    fusion_launcher::run()
}
